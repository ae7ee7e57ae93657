use super::AssemblerError;

/// What a single source line contains once tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// Nothing to assemble: empty, whitespace or comment-only.
    Blank,

    /// A label declaration (`name:` alone on its line).
    Label(String),

    /// An instruction, as lowercased tokens with commas stripped.
    Instruction(Vec<String>),
}

/// Tokenizes one line: lowercase, strip commas, split on whitespace, stop at
/// a `#` or `//` comment. Block comments are not supported and fail loudly.
pub(crate) fn tokenize(source: &str, line: usize) -> Result<Line, AssemblerError> {
    let mut tokens = Vec::new();

    for word in source.split_whitespace() {
        let token: String = word
            .chars()
            .filter(|c| *c != ',')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if token.is_empty() {
            continue;
        }
        if token.starts_with('#') || token.starts_with("//") {
            break;
        }
        if token.starts_with("/*") {
            return Err(AssemblerError::UnsupportedComment { line });
        }
        tokens.push(token);
    }

    match tokens.as_slice() {
        [] => Ok(Line::Blank),
        [only] if only.ends_with(':') => {
            let name = only.trim_end_matches(':').to_string();
            Ok(Line::Label(name))
        }
        _ => Ok(Line::Instruction(tokens)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn instruction(tokens: &[&str]) -> Line {
        Line::Instruction(tokens.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn lowercases_and_strips_commas() {
        assert_eq!(
            tokenize("ADDI X5, X0, 1", 1),
            Ok(instruction(&["addi", "x5", "x0", "1"]))
        );
    }

    #[test]
    fn comments_end_the_line() {
        assert_eq!(
            tokenize("add x1 x2 x3 # sum", 1),
            Ok(instruction(&["add", "x1", "x2", "x3"]))
        );
        assert_eq!(
            tokenize("add x1 x2 x3 // sum", 1),
            Ok(instruction(&["add", "x1", "x2", "x3"]))
        );
        assert_eq!(tokenize("# a full-line comment", 1), Ok(Line::Blank));
        assert_eq!(tokenize("   ", 1), Ok(Line::Blank));
        assert_eq!(tokenize("", 1), Ok(Line::Blank));
    }

    #[test]
    fn block_comments_are_fatal() {
        assert_eq!(
            tokenize("add x1 x2 x3 /* no", 7),
            Err(AssemblerError::UnsupportedComment { line: 7 })
        );
    }

    #[test]
    fn labels() {
        assert_eq!(tokenize("loop:", 1), Ok(Line::Label("loop".into())));
        // a label next to anything else is not a label line
        assert_eq!(
            tokenize("loop: addi x5 x0 1", 1),
            Ok(instruction(&["loop:", "addi", "x5", "x0", "1"]))
        );
    }
}
