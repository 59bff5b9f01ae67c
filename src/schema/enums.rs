use crate::schema::model::Scalar;
use indexmap::IndexMap;

/// Separator between a key and its label in comment mappings.
const ARROW: &str = "=>";

/// Parses a comment such as `Y => Active, N => Inactive` into an ordered
/// key to label mapping. `None` when the comment holds no `=>`.
///
/// Pairs missing either side are dropped; a repeated key keeps its first
/// position and takes the later label.
pub fn parse_comment_mapping(comment: &str) -> Option<IndexMap<String, String>> {
    if !comment.contains(ARROW) {
        return None;
    }
    let mut mapping = IndexMap::<String, String>::new();
    for part in comment.split(',') {
        let mut sides = part.split(ARROW).map(strip_quotes);
        let key = sides.next().unwrap_or_default();
        let label = sides.next().unwrap_or_default();
        if !key.is_empty() && !label.is_empty() {
            mapping.insert(key.to_owned(), label.to_owned());
        }
    }
    Some(mapping)
}

/// Splits an explicit `enum_values` cell on `,`.
pub fn parse_enum_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(strip_quotes)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Trims and removes one leading and one trailing quote character.
pub fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix(['\'', '"']).unwrap_or(text);
    text.strip_suffix(['\'', '"']).unwrap_or(text)
}

/// Enumeration and default of one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedEnum {
    pub enum_values: Option<Vec<String>>,
    pub default_value: Option<Scalar>,
}

/// Resolves the enumeration from the comment mapping, or failing that from
/// the explicit list, and translates a default matching a mapping key to
/// its label.
pub fn resolve_enum(comments: Option<&str>, enum_values: Option<&str>, default_value: Option<Scalar>) -> ResolvedEnum {
    let mapping = comments
        .and_then(parse_comment_mapping)
        .filter(|mapping| !mapping.is_empty());
    if let Some(mapping) = mapping {
        let default_value = default_value.map(|value| match mapping.get(value.to_string().trim()) {
            Some(label) => Scalar::Text(label.to_owned()),
            None => value,
        });
        return ResolvedEnum {
            enum_values: Some(mapping.into_values().collect()),
            default_value,
        };
    }

    ResolvedEnum {
        enum_values: enum_values
            .map(parse_enum_list)
            .filter(|values| !values.is_empty()),
        default_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> Option<Scalar> {
        Some(Scalar::Text(value.to_owned()))
    }

    fn labels(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|value| value.to_string()).collect())
    }

    #[test]
    fn comment_mapping_translates_default() {
        let resolved = resolve_enum(Some("Y => Active, N => Inactive"), None, text("Y"));
        assert_eq!(resolved.enum_values, labels(&["Active", "Inactive"]));
        assert_eq!(resolved.default_value, text("Active"));
    }

    #[test]
    fn explicit_list_is_verbatim() {
        let resolved = resolve_enum(None, Some("draft, published"), text("draft"));
        assert_eq!(resolved.enum_values, labels(&["draft", "published"]));
        assert_eq!(resolved.default_value, text("draft"));
    }

    #[test]
    fn comment_mapping_wins_over_list() {
        let resolved = resolve_enum(Some("1 => Low, 2 => High"), Some("a, b"), Some(Scalar::Number(2.0)));
        assert_eq!(resolved.enum_values, labels(&["Low", "High"]));
        assert_eq!(resolved.default_value, text("High"));
    }

    #[test]
    fn unmapped_default_keeps_its_type() {
        let resolved = resolve_enum(Some("Y => Active"), None, Some(Scalar::Boolean(true)));
        assert_eq!(resolved.default_value, Some(Scalar::Boolean(true)));
        let resolved = resolve_enum(Some("Y => Active"), None, text("Active"));
        assert_eq!(resolved.default_value, text("Active"));
    }

    #[test]
    fn quotes_are_stripped() {
        let mapping = parse_comment_mapping(r#"'a' => 'Apple', "b" => "Banana""#).unwrap();
        assert_eq!(mapping.get("a").map(String::as_str), Some("Apple"));
        assert_eq!(mapping.get("b").map(String::as_str), Some("Banana"));
        assert_eq!(parse_enum_list(r#"'draft', "published""#), vec!["draft", "published"]);
        assert_eq!(strip_quotes("''x''"), "'x'");
    }

    #[test]
    fn incomplete_pairs_are_dropped() {
        let mapping = parse_comment_mapping("A => Alpha, just text, => Orphan, B =>").unwrap();
        assert_eq!(mapping.into_iter().collect::<Vec<_>>(), vec![("A".to_owned(), "Alpha".to_owned())]);
    }

    #[test]
    fn repeated_key_keeps_first_position() {
        let mapping = parse_comment_mapping("a => 1, b => 2, a => 3").unwrap();
        assert_eq!(mapping.values().collect::<Vec<_>>(), vec!["3", "2"]);
    }

    #[test]
    fn no_arrow_means_no_mapping() {
        assert_eq!(parse_comment_mapping("Customer status"), None);
        let resolved = resolve_enum(Some("Customer status"), None, text("x"));
        assert_eq!(resolved.enum_values, None);
    }

    #[test]
    fn empty_mapping_falls_back_to_list() {
        let resolved = resolve_enum(Some("=>"), Some("x, y"), None);
        assert_eq!(resolved.enum_values, labels(&["x", "y"]));
        let resolved = resolve_enum(Some("=>"), None, None);
        assert_eq!(resolved, ResolvedEnum::default());
    }

    #[test]
    fn blank_list_is_no_enum() {
        assert_eq!(resolve_enum(None, Some(" , "), None).enum_values, None);
    }
}
