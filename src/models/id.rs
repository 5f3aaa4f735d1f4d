use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Identity of a column, card or reminder.
///
/// Records coming from the backend carry integer IDs. Records inserted
/// optimistically carry a `Temp` ID until the server answers, so a
/// placeholder can never be mistaken for (or collide with) a real row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Server(i64),
    Temp(Uuid),
}

impl EntityId {
    pub fn temp() -> Self {
        EntityId::Temp(Uuid::new_v4())
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, EntityId::Temp(_))
    }

    pub fn server_id(&self) -> Option<i64> {
        match self {
            EntityId::Server(id) => Some(*id),
            EntityId::Temp(_) => None,
        }
    }

    /// The server ID, or `PendingId` while the entity is still being created.
    pub fn require_server(&self) -> Result<i64> {
        self.server_id().ok_or(AppError::PendingId(*self))
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Server(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Server(id) => write!(f, "{}", id),
            EntityId::Temp(id) => write!(f, "temp-{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_ids_deserialize_from_numbers() {
        let id: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(id, EntityId::Server(42));
        assert_eq!(id.require_server().unwrap(), 42);
    }

    #[test]
    fn test_temp_ids_are_distinct_and_unsaved() {
        let a = EntityId::temp();
        let b = EntityId::temp();
        assert_ne!(a, b);
        assert!(a.is_temp());
        assert!(matches!(a.require_server(), Err(AppError::PendingId(id)) if id == a));
    }
}
