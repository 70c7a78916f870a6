fn main() {
    if let Err(err) = prompt_tags::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
