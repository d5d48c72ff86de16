use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents ways to locate an element in the page under verification.
///
/// A selector is an immutable description; it never holds a live element.
/// Resolution happens freshly on each use against current page state, since
/// the DOM mutates between actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by ARIA role and optional accessible name
    Role { role: String, name: Option<String> },
    /// Select by the element's own visible text
    Text(String),
    /// Select by a structural CSS selector
    Css(String),
    /// Select a form control by its label text
    Label(String),
    /// Chain selectors, each scoping the next (outer to inner)
    Chain(Vec<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }
        let s = s.trim();

        // Literal-value prefixes come first so a '|' inside the value
        // (e.g. "text:a|b") stays part of the value.
        if let Some(rest) = s.strip_prefix("text:") {
            return Selector::Text(rest.to_string());
        }
        if let Some(rest) = s.strip_prefix("css:") {
            return Selector::Css(rest.trim().to_string());
        }
        if let Some(rest) = s.strip_prefix("label:") {
            return Selector::Label(rest.to_string());
        }

        // role|name is the preferred precise form, e.g. "button|Se connecter"
        if s.contains('|') {
            let mut halves = s.splitn(2, '|');
            let role_part = halves.next().unwrap_or_default().trim();
            let name_part = halves.next().unwrap_or_default().trim();
            let role = role_part.strip_prefix("role:").unwrap_or(role_part);
            let name = name_part.strip_prefix("name:").unwrap_or(name_part);
            if role.is_empty() {
                return Selector::Invalid(format!("empty role in \"{s}\""));
            }
            return Selector::Role {
                role: role.to_string(),
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
            };
        }

        match s {
            "" => Selector::Invalid("empty selector".to_string()),
            _ if s.starts_with("role:") => Selector::Role {
                role: s["role:".len()..].trim().to_string(),
                name: None,
            },
            // Bare common roles read naturally in scenarios ("heading", "button")
            "button" | "link" | "heading" | "textbox" | "checkbox" | "row" | "columnheader"
            | "grid" | "dialog" => Selector::Role {
                role: s.to_string(),
                name: None,
            },
            _ => Selector::Invalid(format!(
                "unknown selector format: \"{s}\". Use 'role:', 'text:', 'css:', 'label:', \
                 or the 'role|name' shorthand"
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Role { role, name: None } => write!(f, "role:{role}"),
            Selector::Role {
                role,
                name: Some(name),
            } => write!(f, "{role}|{name}"),
            Selector::Text(t) => write!(f, "text:{t}"),
            Selector::Css(c) => write!(f, "css:{c}"),
            Selector::Label(l) => write!(f, "label:{l}"),
            Selector::Chain(parts) => {
                let joined: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", joined.join(" >> "))
            }
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

// Scenario files carry selectors in their string form.
impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match Selector::from(s.as_str()) {
            Selector::Invalid(reason) => Err(serde::de::Error::custom(reason)),
            ok => Ok(ok),
        }
    }
}

impl Selector {
    /// Validation hook for scenario loading: surfaces `Invalid` parts,
    /// including ones nested inside a chain.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Selector::Invalid(reason) => Err(reason.clone()),
            Selector::Chain(parts) => {
                for p in parts {
                    p.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
