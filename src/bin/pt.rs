//! Short binary name (`pt`) that forwards to the `prompt_tags` library.
//! Keeping the alias as a real binary avoids shell alias requirements.

fn main() {
    if let Err(err) = prompt_tags::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
