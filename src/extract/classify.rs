//! Heuristic classification of HTML text into priority tiers.
//!
//! Walks the parsed document depth-first and resolves a `(tier, in_list)`
//! context for every element from its parent's context alone. Text nodes
//! take the tier of their immediate parent element.
//!
//! The walk uses an explicit stack instead of recursion, so deeply nested
//! markup cannot exhaust the thread stack.

use scraper::{ElementRef, Html};

/// Priority bucket for extracted text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    Title,
    Heading,
    Content,
    Navigation,
}

/// One trimmed, non-empty text run and the tier it was classified as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedText<'a> {
    pub tier: Tier,
    pub text: &'a str,
}

/// Element ids containing any of these mark page chrome.
const BOILERPLATE_ID_MARKERS: &[&str] = &["header", "footer", "menu"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Context {
    tier: Tier,
    in_list: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            tier: Tier::Content,
            in_list: false,
        }
    }
}

enum Frame<'a> {
    Element(ElementRef<'a>, Context),
    Text(&'a str, Tier),
}

/// Lazy sequence of classified text runs of one document.
pub struct Classifier<'a> {
    stack: Vec<Frame<'a>>,
}

/// Classify every text run of `document`.
///
/// A document without an element root yields nothing.
pub fn classify(document: &Html) -> Classifier<'_> {
    let stack = document
        .tree
        .root()
        .children()
        .find_map(ElementRef::wrap)
        .map(|root| vec![Frame::Element(root, Context::default())])
        .unwrap_or_default();

    Classifier { stack }
}

impl<'a> Iterator for Classifier<'a> {
    type Item = ClassifiedText<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Text(text, tier) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Some(ClassifiedText { tier, text });
                    }
                }
                Frame::Element(element, inherited) => {
                    let Some(context) = resolve(element, inherited) else {
                        continue;
                    };

                    // reversed so the first child is popped first
                    for child in element.children().rev() {
                        if let Some(text) = child.value().as_text() {
                            let text: &'a str = text;
                            self.stack.push(Frame::Text(text, context.tier));
                        } else if let Some(child) = ElementRef::wrap(child) {
                            self.stack.push(Frame::Element(child, context));
                        }
                    }
                }
            }
        }

        None
    }
}

/// Resolve the context of `element` from its parent's. `None` drops the
/// whole subtree.
fn resolve(element: ElementRef<'_>, inherited: Context) -> Option<Context> {
    let value = element.value();
    let mut context = inherited;

    match value.name() {
        "script" | "style" | "noscript" | "textarea" => return None,
        "title" => context.tier = Tier::Title,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            if inherited.tier == Tier::Content {
                context.tier = Tier::Heading;
            }
        }
        "nav" | "header" | "footer" | "aside" => context.tier = Tier::Navigation,
        "ul" => context.in_list = true,
        "a" => {
            if inherited.tier == Tier::Content && inherited.in_list {
                context.tier = Tier::Navigation;
            }
        }
        _ => {
            if inherited.tier == Tier::Content && value.attr("id").is_some_and(is_boilerplate_id)
            {
                context.tier = Tier::Navigation;
            }
        }
    }

    Some(context)
}

fn is_boilerplate_id(id: &str) -> bool {
    BOILERPLATE_ID_MARKERS
        .iter()
        .any(|marker| id.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(html: &str) -> Vec<(Tier, String)> {
        let document = Html::parse_document(html);
        classify(&document)
            .map(|run| (run.tier, run.text.to_string()))
            .collect()
    }

    fn tier_of(html: &str, text: &str) -> Option<Tier> {
        runs(html)
            .into_iter()
            .find(|(_, t)| t == text)
            .map(|(tier, _)| tier)
    }

    #[test]
    fn test_document_order() {
        let runs = runs(
            "<title>Site</title><body><nav><a>Home</a></nav><h1>Welcome</h1><p>Hello world.</p></body>",
        );
        assert_eq!(
            runs,
            vec![
                (Tier::Title, "Site".to_string()),
                (Tier::Navigation, "Home".to_string()),
                (Tier::Heading, "Welcome".to_string()),
                (Tier::Content, "Hello world.".to_string()),
            ]
        );
    }

    #[test]
    fn test_heading_promotion() {
        assert_eq!(
            tier_of("<body><h2>Section</h2></body>", "Section"),
            Some(Tier::Heading)
        );
    }

    #[test]
    fn test_navigation_overrides_heading() {
        assert_eq!(
            tier_of("<body><nav><h1>Menu title</h1></nav></body>", "Menu title"),
            Some(Tier::Navigation)
        );
        assert_eq!(
            tier_of("<body><h1><nav>Inside</nav></h1></body>", "Inside"),
            Some(Tier::Navigation)
        );
    }

    #[test]
    fn test_skipped_subtrees() {
        let runs = runs(
            "<head><style>body { color: red }</style></head>\
             <body><script>var x = 1;</script><noscript>enable js</noscript>\
             <textarea>draft</textarea><p>kept</p></body>",
        );
        assert_eq!(runs, vec![(Tier::Content, "kept".to_string())]);
    }

    #[test]
    fn test_list_link_demotion() {
        assert_eq!(
            tier_of("<body><ul><li><a href=\"/\">Home</a></li></ul></body>", "Home"),
            Some(Tier::Navigation)
        );
        // list items without links stay content
        assert_eq!(
            tier_of("<body><ul><li>Point</li></ul></body>", "Point"),
            Some(Tier::Content)
        );
        // links outside of lists stay content
        assert_eq!(
            tier_of("<body><p><a href=\"/\">inline</a></p></body>", "inline"),
            Some(Tier::Content)
        );
    }

    #[test]
    fn test_boilerplate_ids() {
        assert_eq!(
            tier_of("<body><div id=\"site-header\">Logo</div></body>", "Logo"),
            Some(Tier::Navigation)
        );
        assert_eq!(
            tier_of("<body><div id=\"footer\">Imprint</div></body>", "Imprint"),
            Some(Tier::Navigation)
        );
        assert_eq!(
            tier_of("<body><div id=\"mainmenu\">Entries</div></body>", "Entries"),
            Some(Tier::Navigation)
        );
        assert_eq!(
            tier_of("<body><div id=\"article\">Story</div></body>", "Story"),
            Some(Tier::Content)
        );
    }

    #[test]
    fn test_boilerplate_id_does_not_touch_headings() {
        assert_eq!(
            tier_of("<body><h1><span id=\"menu\">Heading</span></h1></body>", "Heading"),
            Some(Tier::Heading)
        );
    }

    #[test]
    fn test_text_takes_immediate_parent_tier() {
        let runs = runs("<body><div>before<h3>head</h3>after</div></body>");
        assert_eq!(
            runs,
            vec![
                (Tier::Content, "before".to_string()),
                (Tier::Heading, "head".to_string()),
                (Tier::Content, "after".to_string()),
            ]
        );
    }

    #[test]
    fn test_runs_are_trimmed_and_blank_runs_dropped() {
        let runs = runs("<body><p>   spaced   </p><p>  \n\t </p></body>");
        assert_eq!(runs, vec![(Tier::Content, "spaced".to_string())]);
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let runs = runs("<body><p>open <b>bold <i>both</p> tail</div>");
        let texts: Vec<_> = runs.into_iter().map(|(_, t)| t).collect();
        assert!(texts.contains(&"open".to_string()));
        assert!(texts.contains(&"both".to_string()));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 5_000;
        let html = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let runs = runs(&html);
        assert_eq!(runs, vec![(Tier::Content, "deep".to_string())]);
    }
}
