//! Permission grants

/// Principal a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Public access, any principal.
    Any,
    /// Principals carrying a named label.
    Label(String),
}

impl Role {
    /// Role for a named label.
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }
}

/// Action authorized by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read documents/files.
    Read,
    /// Create documents/files.
    Create,
    /// Update documents/files.
    Update,
    /// Delete documents/files.
    Delete,
}

impl Action {
    /// Parse a schema action string, case-insensitive. Unknown actions
    /// yield `None` so callers can skip them with a diagnostic.
    pub fn parse(action: &str) -> Option<Self> {
        match action.to_ascii_lowercase().as_str() {
            "read" => Some(Self::Read),
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A (role, action) pair authorizing access to a collection or bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    /// Who the grant applies to.
    pub role: Role,
    /// What the role may do.
    pub action: Action,
}

impl Grant {
    /// Build a single grant.
    pub fn new(role: Role, action: Action) -> Self {
        Self { role, action }
    }

    /// Full CRUD for one role.
    pub fn full_crud(role: &Role) -> Vec<Grant> {
        [Action::Read, Action::Create, Action::Update, Action::Delete]
            .into_iter()
            .map(|action| Grant::new(role.clone(), action))
            .collect()
    }
}
