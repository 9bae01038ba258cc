use std::fmt;

/// How an element attaches to the element before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// No separator: `a.b`, `&:hover`, `&-title`.
    None,
    Descendant,
    Child,
    AdjacentSibling, // +
    GeneralSibling,  // ~
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Type, class, id, pseudo or universal text in source form
    /// (`div`, `.btn`, `#main`, `:hover`, `*`).
    Literal(String),
    /// `[name]`, `[name=value]`, `[name^="value"]` ...
    Attribute {
        name: String,
        op: Option<String>,
        value: Option<String>,
    },
    /// `&`, the enclosing selector.
    Wildcard,
}

/// One combinator + element pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub combinator: Combinator,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(combinator: Combinator, kind: ElementKind) -> Self {
        Self { combinator, kind }
    }

    pub fn literal(combinator: Combinator, text: impl Into<String>) -> Self {
        Self::new(combinator, ElementKind::Literal(text.into()))
    }

    pub fn wildcard(combinator: Combinator) -> Self {
        Self::new(combinator, ElementKind::Wildcard)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, ElementKind::Wildcard)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    pub elements: Vec<Element>,
}

impl Selector {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn wildcard_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_wildcard()).count()
    }

    pub fn has_wildcard(&self) -> bool {
        self.elements.iter().any(Element::is_wildcard)
    }

    /// The name this selector answers to when called as a mixin.
    ///
    /// Only single class or id selectors (`.button`, `#theme`) are callable.
    pub fn mixin_name(&self) -> Option<&str> {
        match self.elements.as_slice() {
            [Element {
                kind: ElementKind::Literal(text),
                ..
            }] if text.starts_with('.') || text.starts_with('#') => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ElementKind::Literal(text) => f.write_str(text),
            ElementKind::Wildcard => f.write_str("&"),
            ElementKind::Attribute { name, op, value } => {
                write!(f, "[{name}")?;
                if let (Some(op), Some(value)) = (op, value) {
                    write!(f, "{op}{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            let sep = match (i, element.combinator) {
                (_, Combinator::None) | (0, Combinator::Descendant) => "",
                (0, Combinator::Child) => "> ",
                (0, Combinator::AdjacentSibling) => "+ ",
                (0, Combinator::GeneralSibling) => "~ ",
                (_, Combinator::Descendant) => " ",
                (_, Combinator::Child) => " > ",
                (_, Combinator::AdjacentSibling) => " + ",
                (_, Combinator::GeneralSibling) => " ~ ",
            };
            write!(f, "{sep}{element}")?;
        }
        Ok(())
    }
}
