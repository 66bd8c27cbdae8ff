//! Parsing of pack definition files.
//!
//! Every line longer than two characters is either an explicit mapping
//! `asset|emoji` or a bare file name like `U+1F1FA-U+1F1F8-1` whose codepoints
//! spell out the emoji.

/// The platform refuses sets with this many stickers.
pub const MAX_DEFINITIONS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// File name of the image, without extension.
    pub asset_id: String,
    pub emoji: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("pack has {count} definitions, it has to be split at {MAX_DEFINITIONS}")]
    TooManyDefinitions { count: usize },
}

/// Parses a definition file. Codepoint-derived definitions come first,
/// explicit mappings after them.
pub fn parse_definitions(text: &str) -> Result<Vec<Definition>, DefinitionError> {
    let mut implicit = vec![];
    let mut explicit = vec![];

    for line in text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.chars().count() > 2)
    {
        let mut fields = line.split('|');
        let first = fields.next().unwrap_or_default();
        match fields.next() {
            Some(emoji) => explicit.push(Definition {
                asset_id: first.to_string(),
                emoji: emoji.to_string(),
            }),
            None => match decode_codepoints(first) {
                Some(emoji) => implicit.push(Definition {
                    asset_id: first.to_string(),
                    emoji,
                }),
                None => tracing::debug!("skipping definition line {line:?}"),
            },
        }
    }

    implicit.append(&mut explicit);
    if implicit.len() >= MAX_DEFINITIONS {
        return Err(DefinitionError::TooManyDefinitions {
            count: implicit.len(),
        });
    }
    Ok(implicit)
}

/// Turns `U+1F1FA-U+1F1F8-1` into the emoji it names. The last segment is a
/// variant tag and is ignored.
pub fn decode_codepoints(name: &str) -> Option<String> {
    let segments: Vec<&str> = name.split('-').collect();
    let (_variant, codes) = segments.split_last()?;
    if codes.is_empty() {
        return None;
    }
    codes
        .iter()
        .map(|code| {
            let hex = code.replace('U', "");
            let hex = hex.trim_start_matches('+');
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(asset_id: &str, emoji: &str) -> Definition {
        Definition {
            asset_id: asset_id.to_string(),
            emoji: emoji.to_string(),
        }
    }

    #[test]
    fn explicit_mappings() {
        let defs = parse_definitions("grin|😁\nparty|🎉🥳\n").unwrap();
        assert_eq!(defs, vec![def("grin", "😁"), def("party", "🎉🥳")]);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let defs = parse_definitions("grin|😁|whatever").unwrap();
        assert_eq!(defs, vec![def("grin", "😁")]);
    }

    #[test]
    fn implicit_before_explicit() {
        let defs = parse_definitions("grin|😁\nU+1F600-1\n").unwrap();
        assert_eq!(defs, vec![def("U+1F600-1", "😀"), def("grin", "😁")]);
    }

    #[test]
    fn single_codepoint() {
        assert_eq!(decode_codepoints("U+1F600-1").as_deref(), Some("😀"));
        assert_eq!(decode_codepoints("1F600-sad").as_deref(), Some("😀"));
    }

    #[test]
    fn flag_sequence() {
        assert_eq!(
            decode_codepoints("U+1F1FA-U+1F1F8-1").as_deref(),
            Some("\u{1F1FA}\u{1F1F8}")
        );
    }

    #[test]
    fn zwj_sequence() {
        assert_eq!(
            decode_codepoints("U+1F468-U+200D-U+1F4BB-1").as_deref(),
            Some("\u{1F468}\u{200D}\u{1F4BB}")
        );
    }

    #[test]
    fn short_and_undecodable_lines_are_dropped() {
        let defs = parse_definitions("ab\n\n\nnot-hex\nsmile\n").unwrap();
        assert!(defs.is_empty());
    }

    #[test]
    fn short_lines_are_measured_in_characters() {
        assert!(parse_definitions("é|\n😀|").unwrap().is_empty());
        assert_eq!(parse_definitions("é|😀").unwrap(), vec![def("é", "😀")]);
    }

    #[test]
    fn overflow_boundary() {
        let lines = |n: usize| {
            (0..n)
                .map(|i| format!("asset{i}|😀"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(parse_definitions(&lines(119)).unwrap().len(), 119);
        assert_eq!(
            parse_definitions(&lines(120)),
            Err(DefinitionError::TooManyDefinitions { count: 120 })
        );
    }
}
