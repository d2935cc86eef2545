use crate::selector::{ItemCardPattern, first_has_text, strip_has_text};
use serde_json::{Value, json};

/// Query the driver runs to find the first element a step targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Plain CSS, evaluated as-is
    Css(String),

    /// Elements matching `scope` whose text contains `text`, first match, then
    /// optionally the first `descendant` inside it
    TextFiltered {
        scope: String,
        text: String,
        descendant: Option<Box<Locator>>,
    },
}

impl Locator {
    /// Build the query for an already-normalized selector.
    ///
    /// Item-card selectors become "filter all cards by text, take the first, descend into the
    /// sub-field" rather than the nested selector verbatim. Further has-text fragments after the
    /// first one become text filters of their own, applied inside the previous match.
    pub fn from_selector(selector: &str, pattern: &ItemCardPattern) -> Self {
        let Some(fragment) = first_has_text(selector) else {
            return Locator::Css(selector.trim().to_string());
        };

        let prefix = selector[..fragment.start].trim();
        let (compound, rest) = split_compound(&selector[fragment.end..]);

        if pattern.is_scoped(selector) {
            let remainder = format!("{}{}", &selector[..fragment.start], &selector[fragment.end..]);
            let descendant = match pattern.sub_field(&strip_has_text(&remainder)) {
                Some(field) => Some(Locator::Css(field.to_string())),
                None => Self::descendant(rest, pattern),
            };
            return Locator::TextFiltered {
                scope: pattern.scope.clone(),
                text: fragment.text(),
                descendant: descendant.map(Box::new),
            };
        }

        let scope = format!("{}{}", prefix, compound);
        Locator::TextFiltered {
            scope: if scope.is_empty() { "*".to_string() } else { scope },
            text: fragment.text(),
            descendant: Self::descendant(rest, pattern).map(Box::new),
        }
    }

    fn descendant(rest: &str, pattern: &ItemCardPattern) -> Option<Locator> {
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(Self::from_selector(rest, pattern))
        }
    }

    /// Human-readable form used in logs and error messages
    pub fn describe(&self) -> String {
        match self {
            Locator::Css(selector) => selector.clone(),
            Locator::TextFiltered { scope, text, descendant } => match descendant {
                Some(descendant) => format!("{}:has-text({:?}) {}", scope, text, descendant.describe()),
                None => format!("{}:has-text({:?})", scope, text),
            },
        }
    }

    /// JSON form consumed by the in-page locate script
    pub fn to_query(&self) -> Value {
        match self {
            Locator::Css(selector) => json!({ "kind": "css", "selector": selector }),
            Locator::TextFiltered { scope, text, descendant } => json!({
                "kind": "text",
                "scope": scope,
                "text": text,
                "descendant": descendant.as_ref().map(|d| d.to_query()),
            }),
        }
    }
}

/// Split the text after a has-text fragment into the compound selector it still belongs to
/// (e.g. `.active` in `li:has-text("x").active`) and the descendant part after a combinator.
fn split_compound(suffix: &str) -> (&str, &str) {
    let boundary = suffix
        .find(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
        .unwrap_or(suffix.len());
    (&suffix[..boundary], suffix[boundary..].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(selector: &str) -> Locator {
        Locator::from_selector(selector, &ItemCardPattern::default())
    }

    fn css(selector: &str) -> Option<Box<Locator>> {
        Some(Box::new(Locator::Css(selector.to_string())))
    }

    #[test]
    fn test_plain_css() {
        assert_eq!(locate("[data-test=\"username\"]"), Locator::Css("[data-test=\"username\"]".to_string()));
    }

    #[test]
    fn test_item_card_field() {
        assert_eq!(
            locate(".inventory_item:has-text(\"Backpack\") .inventory_item_price"),
            Locator::TextFiltered {
                scope: ".inventory_item".to_string(),
                text: "Backpack".to_string(),
                descendant: css(".inventory_item_price"),
            }
        );
    }

    #[test]
    fn test_item_card_without_field_keeps_descendant() {
        assert_eq!(
            locate(".inventory_item:has-text(\"Backpack\") button"),
            Locator::TextFiltered {
                scope: ".inventory_item".to_string(),
                text: "Backpack".to_string(),
                descendant: css("button"),
            }
        );
    }

    #[test]
    fn test_generic_has_text() {
        assert_eq!(
            locate("button:has-text(\"Add to cart\")"),
            Locator::TextFiltered {
                scope: "button".to_string(),
                text: "Add to cart".to_string(),
                descendant: None,
            }
        );
    }

    #[test]
    fn test_generic_has_text_with_compound_and_child() {
        assert_eq!(
            locate("ul li:has-text(\"Two\").active > a"),
            Locator::TextFiltered {
                scope: "ul li.active".to_string(),
                text: "Two".to_string(),
                descendant: css("> a"),
            }
        );
    }

    #[test]
    fn test_bare_has_text_scopes_everything() {
        assert_eq!(
            locate(":has-text(\"Sign in\")"),
            Locator::TextFiltered {
                scope: "*".to_string(),
                text: "Sign in".to_string(),
                descendant: None,
            }
        );
    }

    #[test]
    fn test_unescaped_text() {
        match locate(r#"div:has-text("The \"Best\"")"#) {
            Locator::TextFiltered { text, .. } => assert_eq!(text, "The \"Best\""),
            other => panic!("Expected text filter, got {:?}", other),
        }
        match locate(r#"td:has-text("C:\\temp\\")"#) {
            Locator::TextFiltered { text, .. } => assert_eq!(text, r"C:\temp\"),
            other => panic!("Expected text filter, got {:?}", other),
        }
    }

    #[test]
    fn test_later_fragments_chain_as_nested_filters() {
        let locator = locate("ul li:has-text(\"A\") span:has-text(\"B\") em");
        assert_eq!(
            locator,
            Locator::TextFiltered {
                scope: "ul li".to_string(),
                text: "A".to_string(),
                descendant: Some(Box::new(Locator::TextFiltered {
                    scope: "span".to_string(),
                    text: "B".to_string(),
                    descendant: css("em"),
                })),
            }
        );
        assert_eq!(locator.describe(), "ul li:has-text(\"A\") span:has-text(\"B\") em");
    }

    #[test]
    fn test_item_card_with_filtered_button() {
        assert_eq!(
            locate(".inventory_item:has-text(\"Backpack\") button:has-text(\"Remove\")"),
            Locator::TextFiltered {
                scope: ".inventory_item".to_string(),
                text: "Backpack".to_string(),
                descendant: Some(Box::new(Locator::TextFiltered {
                    scope: "button".to_string(),
                    text: "Remove".to_string(),
                    descendant: None,
                })),
            }
        );
    }

    #[test]
    fn test_field_word_inside_later_fragment_is_ignored() {
        // "price" only appears inside the second fragment's text
        match locate(".inventory_item:has-text(\"Backpack\") button:has-text(\"price match\")") {
            Locator::TextFiltered { descendant: Some(descendant), .. } => {
                assert!(matches!(*descendant, Locator::TextFiltered { .. }), "{:?}", descendant)
            }
            other => panic!("Expected nested text filter, got {:?}", other),
        }
    }

    #[test]
    fn test_query_nests_descendants() {
        let query = locate("ul li:has-text(\"A\") span:has-text(\"B\")").to_query();
        assert_eq!(
            query,
            json!({
                "kind": "text",
                "scope": "ul li",
                "text": "A",
                "descendant": {"kind": "text", "scope": "span", "text": "B", "descendant": null}
            })
        );
        assert_eq!(
            Locator::Css("#go".to_string()).to_query(),
            json!({"kind": "css", "selector": "#go"})
        );
    }
}
