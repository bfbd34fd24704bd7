//! Rural producer domain types

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProducerType {
    Family,
    Cooperative,
    Association,
    Commercial,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProducerStatus {
    Active,
    Inactive,
}

impl Default for ProducerStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub name: String,
    /// Total area in hectares
    pub area_hectares: Decimal,
    #[serde(default)]
    pub cultivated_hectares: Decimal,
    #[serde(default)]
    pub address: Address,
    /// Rural environmental registry (CAR) code
    #[serde(default)]
    pub car_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Harvest {
    pub id: String,
    pub crop: String,
    pub harvested_on: NaiveDate,
    pub quantity_kg: Decimal,
    #[serde(default)]
    pub area_hectares: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalAssistance {
    pub id: String,
    pub technician: String,
    pub topic: String,
    pub visited_on: NaiveDate,
    #[serde(default)]
    pub recommendations: Option<String>,
}

/// Rural producer entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuralProducer {
    pub id: String,
    pub name: String,
    pub document_number: String,
    pub producer_type: ProducerType,
    pub status: ProducerStatus,
    #[serde(default)]
    pub contact: ContactInfo,
    pub property: Property,
    #[serde(default)]
    pub crops: Vec<String>,
    /// Holds a family farming declaration (DAP/CAF)
    #[serde(default)]
    pub family_farming: bool,
    #[serde(default)]
    pub harvests: Vec<Harvest>,
    #[serde(default)]
    pub assistance: Vec<TechnicalAssistance>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuralProducerRequest {
    pub name: String,
    pub document_number: String,
    pub producer_type: ProducerType,
    #[serde(default)]
    pub contact: ContactInfo,
    pub property: Property,
    #[serde(default)]
    pub crops: Vec<String>,
    #[serde(default)]
    pub family_farming: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRuralProducerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_type: Option<ProducerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProducerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crops: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_farming: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProducerFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_type: Option<ProducerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProducerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestRecord {
    pub crop: String,
    pub harvested_on: NaiveDate,
    pub quantity_kg: Decimal,
    #[serde(default)]
    pub area_hectares: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistanceVisit {
    pub technician: String,
    pub topic: String,
    pub visited_on: NaiveDate,
    #[serde(default)]
    pub recommendations: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuralProducerAction {
    RecordHarvest(HarvestRecord),
    RegisterAssistance(AssistanceVisit),
}

impl SubResourceAction for RuralProducerAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::RecordHarvest(_) => ActionRoute::post("harvests"),
            Self::RegisterAssistance(_) => ActionRoute::post("assistance"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::RecordHarvest(record) => serde_json::to_value(record),
            Self::RegisterAssistance(visit) => serde_json::to_value(visit),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "harvests", None) => Ok(Self::RecordHarvest(decode(body)?)),
            (ActionMethod::Post, "assistance", None) => {
                Ok(Self::RegisterAssistance(decode(body)?))
            }
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl RuralProducer {
    pub fn grows(&self, crop: &str) -> bool {
        self.crops.iter().any(|c| c.eq_ignore_ascii_case(crop))
    }

    pub fn total_harvested_kg(&self) -> Decimal {
        self.harvests.iter().map(|h| h.quantity_kg).sum()
    }
}

impl Resource for RuralProducer {
    const KIND: &'static str = "rural_producers";
    const PATH: &'static str = "/agriculture/producers";
    const ENVELOPE_KEY: &'static str = "producer";

    type Create = CreateRuralProducerRequest;
    type Update = UpdateRuralProducerRequest;
    type Filters = ProducerFilters;
    type Action = RuralProducerAction;

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
        let producer = Self {
            id,
            name: req.name,
            document_number: req.document_number,
            producer_type: req.producer_type,
            status: ProducerStatus::default(),
            contact: req.contact,
            property: req.property,
            crops: req.crops,
            family_farming: req.family_farming,
            harvests: Vec::new(),
            assistance: Vec::new(),
            audit,
        };
        producer.validate()?;
        Ok(producer)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.name, "name")?;
        require_text(&self.document_number, "document_number")?;
        require(
            self.property.area_hectares > Decimal::ZERO,
            "property area must be positive",
        )?;
        require(
            self.property.cultivated_hectares >= Decimal::ZERO
                && self.property.cultivated_hectares <= self.property.area_hectares,
            "cultivated area must fit within the property",
        )
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            RuralProducerAction::RecordHarvest(record) => {
                require_text(&record.crop, "crop")?;
                require(
                    record.quantity_kg > Decimal::ZERO,
                    "harvest quantity must be positive",
                )?;
                require(
                    record.harvested_on <= ctx.now.date_naive(),
                    "harvest date must not be in the future",
                )?;
                if let Some(area) = record.area_hectares {
                    require(
                        area > Decimal::ZERO && area <= self.property.area_hectares,
                        "harvested area must fit within the property",
                    )?;
                }
                if !self.grows(&record.crop) {
                    self.crops.push(record.crop.clone());
                }
                self.harvests.push(Harvest {
                    id: ctx.new_id(),
                    crop: record.crop,
                    harvested_on: record.harvested_on,
                    quantity_kg: record.quantity_kg,
                    area_hectares: record.area_hectares,
                });
            }
            RuralProducerAction::RegisterAssistance(visit) => {
                require_text(&visit.technician, "technician")?;
                require_text(&visit.topic, "topic")?;
                self.assistance.push(TechnicalAssistance {
                    id: ctx.new_id(),
                    technician: visit.technician,
                    topic: visit.topic,
                    visited_on: visit.visited_on,
                    recommendations: visit.recommendations,
                });
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.producer_type.map_or(true, |t| self.producer_type == t)
            && filters.status.map_or(true, |s| self.status == s)
            && filters.crop.as_deref().map_or(true, |c| self.grows(c))
    }
}

// Selectors

pub fn by_type<'a>(
    producers: impl IntoIterator<Item = &'a RuralProducer>,
    producer_type: ProducerType,
) -> Vec<RuralProducer> {
    collect_where(producers, |p| p.producer_type == producer_type)
}

pub fn active<'a>(producers: impl IntoIterator<Item = &'a RuralProducer>) -> Vec<RuralProducer> {
    collect_where(producers, |p| p.status == ProducerStatus::Active)
}

pub fn family_farmers<'a>(
    producers: impl IntoIterator<Item = &'a RuralProducer>,
) -> Vec<RuralProducer> {
    collect_where(producers, |p| p.family_farming)
}

pub fn total_area<'a>(producers: impl IntoIterator<Item = &'a RuralProducer>) -> Decimal {
    producers.into_iter().map(|p| p.property.area_hectares).sum()
}

/// Harvested kilograms per crop, keyed by lowercase crop name
pub fn production_by_crop<'a>(
    producers: impl IntoIterator<Item = &'a RuralProducer>,
) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for harvest in producers.into_iter().flat_map(|p| p.harvests.iter()) {
        *totals
            .entry(harvest.crop.to_lowercase())
            .or_insert(Decimal::ZERO) += harvest.quantity_kg;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(id: &str, hectares: i64) -> RuralProducer {
        RuralProducer::from_create(
            id.to_string(),
            Audit::new(None),
            CreateRuralProducerRequest {
                name: "Sítio Boa Vista".to_string(),
                document_number: "12345678909".to_string(),
                producer_type: ProducerType::Family,
                contact: ContactInfo::default(),
                property: Property {
                    name: "Boa Vista".to_string(),
                    area_hectares: Decimal::new(hectares, 0),
                    cultivated_hectares: Decimal::ZERO,
                    address: Address::default(),
                    car_code: None,
                },
                crops: vec!["Milho".to_string()],
                family_farming: true,
            },
        )
        .unwrap()
    }

    fn harvest(crop: &str, kg: i64) -> RuralProducerAction {
        RuralProducerAction::RecordHarvest(HarvestRecord {
            crop: crop.to_string(),
            harvested_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            quantity_kg: Decimal::new(kg, 0),
            area_hectares: None,
        })
    }

    #[test]
    fn zero_area_is_rejected() {
        let err = RuralProducer::from_create(
            "p".to_string(),
            Audit::new(None),
            CreateRuralProducerRequest {
                name: "x".to_string(),
                document_number: "1".to_string(),
                producer_type: ProducerType::Commercial,
                contact: ContactInfo::default(),
                property: Property {
                    name: "x".to_string(),
                    area_hectares: Decimal::ZERO,
                    cultivated_hectares: Decimal::ZERO,
                    address: Address::default(),
                    car_code: None,
                },
                crops: Vec::new(),
                family_farming: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn production_is_aggregated_per_crop() {
        let ctx = ActionContext::new(None);
        let mut a = producer("a", 10);
        let mut b = producer("b", 5);
        a.apply(harvest("Milho", 1000), &ctx).unwrap();
        b.apply(harvest("milho", 500), &ctx).unwrap();
        b.apply(harvest("Feijão", 200), &ctx).unwrap();

        assert!(b.grows("feijão"));
        let totals = production_by_crop(&[a.clone(), b.clone()]);
        assert_eq!(totals.get("milho"), Some(&Decimal::new(1500, 0)));
        assert_eq!(totals.get("feijão"), Some(&Decimal::new(200, 0)));
        assert_eq!(total_area(&[a, b]), Decimal::new(15, 0));
    }

    #[test]
    fn harvested_area_cannot_exceed_property() {
        let ctx = ActionContext::new(None);
        let mut p = producer("a", 2);
        let action = RuralProducerAction::RecordHarvest(HarvestRecord {
            crop: "Soja".to_string(),
            harvested_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            quantity_kg: Decimal::new(100, 0),
            area_hectares: Some(Decimal::new(3, 0)),
        });
        assert!(p.apply(action, &ctx).is_err());
        assert!(p.harvests.is_empty());
    }
}
