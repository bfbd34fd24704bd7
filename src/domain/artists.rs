//! Artist registry domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

/// Artistic category, shared with workshops and artist groups
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtCategory {
    Music,
    Dance,
    Theater,
    VisualArts,
    Literature,
    Crafts,
    Audiovisual,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtistStatus {
    Pending,
    Active,
    Inactive,
}

impl Default for ArtistStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Artist entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artistic_name: Option<String>,
    pub category: ArtCategory,
    pub status: ArtistStatus,
    /// National taxpayer document (CPF or CNPJ)
    pub document_number: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub portfolio: Vec<PortfolioItem>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArtistRequest {
    pub name: String,
    #[serde(default)]
    pub artistic_name: Option<String>,
    pub category: ArtCategory,
    pub document_number: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArtistRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artistic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ArtistStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtistFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ArtistStatus>,
    /// Case-insensitive match on name or artistic name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPortfolioItem {
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtistAction {
    AddPortfolioItem(NewPortfolioItem),
    RemovePortfolioItem { item_id: String },
}

impl SubResourceAction for ArtistAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::AddPortfolioItem(_) => ActionRoute::post("portfolio"),
            Self::RemovePortfolioItem { item_id } => ActionRoute::delete_item("portfolio", item_id),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AddPortfolioItem(item) => serde_json::to_value(item),
            Self::RemovePortfolioItem { .. } => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "portfolio", None) => Ok(Self::AddPortfolioItem(decode(body)?)),
            (ActionMethod::Delete, "portfolio", Some(id)) => Ok(Self::RemovePortfolioItem {
                item_id: id.to_string(),
            }),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl Artist {
    /// Name shown on programmes: the artistic name when there is one
    pub fn display_name(&self) -> &str {
        self.artistic_name.as_deref().unwrap_or(&self.name)
    }

    fn name_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .artistic_name
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }
}

impl Resource for Artist {
    const KIND: &'static str = "artists";
    const PATH: &'static str = "/culture/artists";
    const ENVELOPE_KEY: &'static str = "artist";

    type Create = CreateArtistRequest;
    type Update = UpdateArtistRequest;
    type Filters = ArtistFilters;
    type Action = ArtistAction;

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
        let artist = Self {
            id,
            name: req.name,
            artistic_name: req.artistic_name,
            category: req.category,
            status: ArtistStatus::default(),
            document_number: req.document_number,
            contact: req.contact,
            address: req.address,
            bio: req.bio,
            portfolio: Vec::new(),
            audit,
        };
        artist.validate()?;
        Ok(artist)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.name, "name")?;
        let digits = self
            .document_number
            .chars()
            .filter(char::is_ascii_digit)
            .count();
        require(
            digits == 11 || digits == 14,
            "document number must have 11 (CPF) or 14 (CNPJ) digits",
        )
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            ArtistAction::AddPortfolioItem(item) => {
                require_text(&item.title, "portfolio title")?;
                self.portfolio.push(PortfolioItem {
                    id: ctx.new_id(),
                    title: item.title,
                    year: item.year,
                    url: item.url,
                });
            }
            ArtistAction::RemovePortfolioItem { item_id } => {
                let before = self.portfolio.len();
                self.portfolio.retain(|i| i.id != item_id);
                if self.portfolio.len() == before {
                    return Err(DomainError::NotFound(format!("portfolio item {}", item_id)));
                }
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.category.map_or(true, |c| self.category == c)
            && filters.status.map_or(true, |s| self.status == s)
            && filters
                .search
                .as_deref()
                .map_or(true, |needle| self.name_contains(needle))
    }
}

// Selectors

pub fn by_category<'a>(
    artists: impl IntoIterator<Item = &'a Artist>,
    category: ArtCategory,
) -> Vec<Artist> {
    collect_where(artists, |a| a.category == category)
}

pub fn active<'a>(artists: impl IntoIterator<Item = &'a Artist>) -> Vec<Artist> {
    collect_where(artists, |a| a.status == ArtistStatus::Active)
}

pub fn search<'a>(artists: impl IntoIterator<Item = &'a Artist>, needle: &str) -> Vec<Artist> {
    collect_where(artists, |a| a.name_contains(needle))
}
