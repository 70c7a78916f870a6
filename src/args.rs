use crate::tags::Polarity;
use std::error::Error;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Next argument as a trimmed, non-empty tag
    pub fn extract_tag(&mut self) -> Result<String, Box<dyn Error>> {
        match self.iter.next() {
            Some(v) => {
                let tag = crate::tags::normalize_tag(&v);
                if tag.is_empty() {
                    Err(format!("Invalid tag provided to {}", self.command_name)
                        .into())
                } else {
                    Ok(tag)
                }
            }
            None => {
                Err(format!("Provide a tag for {}", self.command_name).into())
            }
        }
    }

    /// Extract a string value for a flag
    pub fn extract_value(
        &mut self,
        flag: &str,
    ) -> Result<String, Box<dyn Error>> {
        self.iter.next().ok_or_else(|| {
            format!("Provide a value after {} for {}", flag, self.command_name)
                .into()
        })
    }

    /// Next argument as a zero-based index
    pub fn extract_index(&mut self) -> Result<usize, Box<dyn Error>> {
        let raw = self.iter.next().ok_or_else(|| {
            format!("Provide an index for {}", self.command_name)
        })?;
        raw.parse::<usize>().map_err(|_| {
            format!("Invalid index for {}: {raw}", self.command_name).into()
        })
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }

    /// Collect remaining args
    pub fn collect_remaining(self) -> Vec<String> {
        self.iter.collect()
    }

    /// Fail when anything is left over
    pub fn finish(mut self) -> Result<(), Box<dyn Error>> {
        match self.iter.next() {
            Some(extra) => Err(format!(
                "Unexpected argument for {}: {extra}",
                self.command_name
            )
            .into()),
            None => Ok(()),
        }
    }
}

/// Pull the polarity flags out of an argument list. `-n/--negative` picks
/// the negative side; `-p/--positive` is accepted for symmetry. The last
/// flag wins.
pub fn split_polarity(args: Vec<String>) -> (Polarity, Vec<String>) {
    let mut polarity = Polarity::Positive;
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match arg.as_str() {
            "-n" | "--negative" => polarity = Polarity::Negative,
            "-p" | "--positive" => polarity = Polarity::Positive,
            _ => rest.push(arg),
        }
    }
    (polarity, rest)
}
