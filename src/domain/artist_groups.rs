//! Artist group domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::artists::ArtCategory;
use super::{
    collect_where, decode, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    Active,
    Inactive,
}

impl Default for GroupStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Registered artist, when the member is one
    #[serde(default)]
    pub artist_id: Option<String>,
}

/// Artist group entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistGroup {
    pub id: String,
    pub name: String,
    pub category: ArtCategory,
    pub status: GroupStatus,
    #[serde(default)]
    pub founded_year: Option<u16>,
    pub representative: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArtistGroupRequest {
    pub name: String,
    pub category: ArtCategory,
    #[serde(default)]
    pub founded_year: Option<u16>,
    pub representative: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArtistGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GroupStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtistGroupFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GroupStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewGroupMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtistGroupAction {
    AddMember(NewGroupMember),
    RemoveMember { member_id: String },
}

impl SubResourceAction for ArtistGroupAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::AddMember(_) => ActionRoute::post("members"),
            Self::RemoveMember { member_id } => ActionRoute::delete_item("members", member_id),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AddMember(member) => serde_json::to_value(member),
            Self::RemoveMember { .. } => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "members", None) => Ok(Self::AddMember(decode(body)?)),
            (ActionMethod::Delete, "members", Some(id)) => Ok(Self::RemoveMember {
                member_id: id.to_string(),
            }),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl Resource for ArtistGroup {
    const KIND: &'static str = "artist_groups";
    const PATH: &'static str = "/culture/artist-groups";
    const ENVELOPE_KEY: &'static str = "group";

    type Create = CreateArtistGroupRequest;
    type Update = UpdateArtistGroupRequest;
    type Filters = ArtistGroupFilters;
    type Action = ArtistGroupAction;

    fn id(&self) -> &str {
        &self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn from_create(id: String, audit: Audit, req: Self::Create) -> Result<Self, DomainError> {
        let group = Self {
            id,
            name: req.name,
            category: req.category,
            status: GroupStatus::default(),
            founded_year: req.founded_year,
            representative: req.representative,
            contact: req.contact,
            description: req.description,
            members: Vec::new(),
            audit,
        };
        group.validate()?;
        Ok(group)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.name, "name")?;
        require_text(&self.representative, "representative")?;
        if let Some(year) = self.founded_year {
            require(year >= 1500, "founded year is not plausible")?;
        }
        Ok(())
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            ArtistGroupAction::AddMember(member) => {
                require_text(&member.name, "member name")?;
                if let Some(artist_id) = &member.artist_id {
                    if self
                        .members
                        .iter()
                        .any(|m| m.artist_id.as_ref() == Some(artist_id))
                    {
                        return Err(DomainError::Conflict(format!(
                            "artist {} is already a member",
                            artist_id
                        )));
                    }
                }
                self.members.push(GroupMember {
                    id: ctx.new_id(),
                    name: member.name,
                    role: member.role,
                    artist_id: member.artist_id,
                });
            }
            ArtistGroupAction::RemoveMember { member_id } => {
                let before = self.members.len();
                self.members.retain(|m| m.id != member_id);
                if self.members.len() == before {
                    return Err(DomainError::NotFound(format!("member {}", member_id)));
                }
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.category.map_or(true, |c| self.category == c)
            && filters.status.map_or(true, |s| self.status == s)
    }
}

// Selectors

pub fn by_category<'a>(
    groups: impl IntoIterator<Item = &'a ArtistGroup>,
    category: ArtCategory,
) -> Vec<ArtistGroup> {
    collect_where(groups, |g| g.category == category)
}

pub fn active<'a>(groups: impl IntoIterator<Item = &'a ArtistGroup>) -> Vec<ArtistGroup> {
    collect_where(groups, |g| g.status == GroupStatus::Active)
}

pub fn total_members<'a>(groups: impl IntoIterator<Item = &'a ArtistGroup>) -> usize {
    groups.into_iter().map(|g| g.members.len()).sum()
}
