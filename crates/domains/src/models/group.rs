//! Groups scope ticket visibility; ticket types classify tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    /// User ids belonging to the group.
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub name: String,
}
