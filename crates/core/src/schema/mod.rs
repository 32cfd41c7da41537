//! Schema catalog
//!
//! Explicit per-logical-type metadata consulted at runtime:
//! - EntityDef: id/name attributes, attribute kinds, states, ownership, keys
//! - RelationshipDef: many-to-many (intersect) and one-to-many relationships
//! - Catalog: immutable lookup table built from the standard table plus any
//!   custom definitions registered through [`CatalogBuilder`]
//!
//! Types that are not declared are synthesized on demand with an open
//! attribute set, so arbitrary custom types can be stored without setup.

pub mod standard;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Attribute shared by every activity type as its primary id.
pub const ACTIVITY_ID: &str = "activityid";

/// Types whose primary id is not `<type>id`.
pub const IRREGULAR_ID_TYPES: &[&str] = &[
    "activitypointer",
    "appointment",
    "campaignactivity",
    "email",
    "fax",
    "incidentresolution",
    "letter",
    "opportunityclose",
    "phonecall",
    "serviceappointment",
    "task",
];

// =============================================================================
// Attribute definitions
// =============================================================================

/// Declared kind of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Primary key or plain guid
    Uniqueidentifier,
    /// Single line of text
    String,
    /// Multiple lines of text
    Memo,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Decimal number
    Decimal,
    /// Floating point number
    Double,
    /// Currency
    Money,
    /// Two options
    Boolean,
    /// Date and time
    DateTime,
    /// Lookup to one or more target types
    Lookup,
    /// Lookup to account or contact
    Customer,
    /// Lookup to systemuser or team
    Owner,
    /// Option set
    Picklist,
    /// Record state
    State,
    /// Record status reason
    Status,
    /// Multi-select option set
    MultiSelectPicklist,
    /// Activity-party list
    PartyList,
    /// Logical type name
    EntityName,
}

impl AttributeKind {
    /// The primitive kind query literals are coerced to.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            AttributeKind::Uniqueidentifier
            | AttributeKind::Lookup
            | AttributeKind::Customer
            | AttributeKind::Owner => ValueType::Guid,
            AttributeKind::String | AttributeKind::Memo | AttributeKind::EntityName => {
                ValueType::String
            }
            AttributeKind::Integer => ValueType::Int,
            AttributeKind::BigInt => ValueType::BigInt,
            AttributeKind::Decimal => ValueType::Decimal,
            AttributeKind::Double => ValueType::Double,
            AttributeKind::Money => ValueType::Money,
            AttributeKind::Boolean => ValueType::Bool,
            AttributeKind::DateTime => ValueType::DateTime,
            AttributeKind::Picklist
            | AttributeKind::State
            | AttributeKind::Status
            | AttributeKind::MultiSelectPicklist => ValueType::OptionSet,
            AttributeKind::PartyList => return None,
        })
    }

    /// True for lookup-like kinds.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            AttributeKind::Lookup | AttributeKind::Customer | AttributeKind::Owner
        )
    }
}

/// Option value with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDef {
    /// Option value
    pub value: i32,
    /// Display label
    pub label: String,
}

impl OptionDef {
    /// Create an option.
    pub fn new(value: i32, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// Attribute metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name
    pub logical_name: String,
    /// Declared kind
    pub kind: AttributeKind,
    /// Lookup target types (empty means any type)
    #[serde(default)]
    pub targets: Vec<String>,
    /// Option labels for picklists
    #[serde(default)]
    pub options: Vec<OptionDef>,
    /// Participation mask for party-list attributes
    #[serde(default)]
    pub participation_mask: Option<i32>,
}

impl AttributeDef {
    /// Attribute of the given kind.
    pub fn new(logical_name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            logical_name: logical_name.into(),
            kind,
            targets: Vec::new(),
            options: Vec::new(),
            participation_mask: None,
        }
    }

    /// Text attribute.
    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeKind::String)
    }

    /// Memo attribute.
    pub fn memo(name: &str) -> Self {
        Self::new(name, AttributeKind::Memo)
    }

    /// Integer attribute.
    pub fn integer(name: &str) -> Self {
        Self::new(name, AttributeKind::Integer)
    }

    /// Decimal attribute.
    pub fn decimal(name: &str) -> Self {
        Self::new(name, AttributeKind::Decimal)
    }

    /// Double attribute.
    pub fn double(name: &str) -> Self {
        Self::new(name, AttributeKind::Double)
    }

    /// Money attribute.
    pub fn money(name: &str) -> Self {
        Self::new(name, AttributeKind::Money)
    }

    /// Boolean attribute.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, AttributeKind::Boolean)
    }

    /// Date/time attribute.
    pub fn datetime(name: &str) -> Self {
        Self::new(name, AttributeKind::DateTime)
    }

    /// Plain guid attribute.
    pub fn guid(name: &str) -> Self {
        Self::new(name, AttributeKind::Uniqueidentifier)
    }

    /// Lookup to the given types (empty slice means any type).
    pub fn lookup(name: &str, targets: &[&str]) -> Self {
        let mut def = Self::new(name, AttributeKind::Lookup);
        def.targets = targets.iter().map(|t| t.to_string()).collect();
        def
    }

    /// Customer lookup (account or contact).
    pub fn customer(name: &str) -> Self {
        let mut def = Self::new(name, AttributeKind::Customer);
        def.targets = vec!["account".into(), "contact".into()];
        def
    }

    /// Option-set attribute.
    pub fn picklist(name: &str, options: &[(i32, &str)]) -> Self {
        let mut def = Self::new(name, AttributeKind::Picklist);
        def.options = options.iter().map(|(v, l)| OptionDef::new(*v, *l)).collect();
        def
    }

    /// Multi-select option-set attribute.
    pub fn multi_select(name: &str, options: &[(i32, &str)]) -> Self {
        let mut def = Self::new(name, AttributeKind::MultiSelectPicklist);
        def.options = options.iter().map(|(v, l)| OptionDef::new(*v, *l)).collect();
        def
    }

    /// Activity-party list with its participation mask.
    pub fn party_list(name: &str, mask: i32) -> Self {
        let mut def = Self::new(name, AttributeKind::PartyList);
        def.participation_mask = Some(mask);
        def
    }

    /// Label of an option value.
    pub fn option_label(&self, value: i32) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }
}

// =============================================================================
// States, keys, ownership
// =============================================================================

/// Declared record state with its status reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    /// State code
    pub value: i32,
    /// State label
    pub label: String,
    /// Status used when none is supplied
    pub default_status: i32,
    /// Valid status reasons for this state
    pub statuses: Vec<OptionDef>,
}

impl StateDef {
    /// Create a state; the first status is the default.
    pub fn new(value: i32, label: &str, statuses: &[(i32, &str)]) -> Self {
        Self {
            value,
            label: label.to_string(),
            default_status: statuses.first().map(|s| s.0).unwrap_or(value + 1),
            statuses: statuses.iter().map(|(v, l)| OptionDef::new(*v, *l)).collect(),
        }
    }

    /// True when `status` belongs to this state.
    pub fn has_status(&self, status: i32) -> bool {
        self.statuses.iter().any(|s| s.value == status)
    }
}

/// Declared alternate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateKey {
    /// Key name
    pub name: String,
    /// Key attributes in declaration order
    pub attributes: Vec<String>,
}

/// Group of attributes of which at least one must be set on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredGroup {
    /// Candidate attributes
    pub attributes: Vec<String>,
    /// Fault message when none is set
    pub message: String,
}

/// Ownership model of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OwnershipType {
    /// No owner fields
    None,
    /// Owned by a user or team (owner triad)
    #[default]
    UserOwned,
    /// Owned by the organization
    OrganizationOwned,
    /// Owned by a business unit
    BusinessOwned,
}

// =============================================================================
// Entity definition
// =============================================================================

/// Metadata for one logical type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Logical type name
    pub logical_name: String,
    /// Primary id attribute
    pub primary_id_attribute: String,
    /// Primary name attribute (resolved at catalog build)
    pub primary_name_attribute: String,
    /// Object type code
    pub object_type_code: i32,
    /// Declared attributes
    pub attributes: BTreeMap<String, AttributeDef>,
    /// Declared states (empty for stateless types)
    pub states: Vec<StateDef>,
    /// State assigned on create
    pub default_state: i32,
    /// Ownership model
    pub ownership: OwnershipType,
    /// Activity family member
    pub is_activity: bool,
    /// Relationship (intersect) row type
    pub is_intersect: bool,
    /// Computes `fullname` from the name template
    pub is_person: bool,
    /// Declared alternate keys
    pub alternate_keys: Vec<AlternateKey>,
    /// Conditionally-required attribute groups
    pub required_groups: Vec<RequiredGroup>,
    /// False for types synthesized on demand
    pub declared: bool,
    #[serde(skip)]
    name_override: Option<String>,
}

impl EntityDef {
    /// Start a user-owned definition with Active/Inactive states.
    pub fn new(logical_name: &str) -> Self {
        let logical_name = logical_name.to_lowercase();
        Self {
            primary_id_attribute: primary_id_for(&logical_name),
            primary_name_attribute: String::new(),
            object_type_code: 0,
            attributes: BTreeMap::new(),
            states: default_states(),
            default_state: 0,
            ownership: OwnershipType::UserOwned,
            is_activity: false,
            is_intersect: false,
            is_person: false,
            alternate_keys: Vec::new(),
            required_groups: Vec::new(),
            declared: true,
            name_override: None,
            logical_name,
        }
    }

    /// Set the object type code.
    pub fn object_type_code(mut self, code: i32) -> Self {
        self.object_type_code = code;
        self
    }

    /// Set the ownership model.
    pub fn ownership(mut self, ownership: OwnershipType) -> Self {
        self.ownership = ownership;
        self
    }

    /// Mark as activity: shared `activityid` key and activity states.
    pub fn activity(mut self) -> Self {
        self.is_activity = true;
        self.primary_id_attribute = ACTIVITY_ID.to_string();
        self.states = activity_states();
        for attr in [
            AttributeDef::string("subject"),
            AttributeDef::memo("description"),
            AttributeDef::lookup("regardingobjectid", &[]),
            AttributeDef::datetime("scheduledstart"),
            AttributeDef::datetime("scheduledend"),
            AttributeDef::datetime("actualend"),
            AttributeDef::picklist("prioritycode", &[(0, "Low"), (1, "Normal"), (2, "High")]),
        ] {
            self.attributes.insert(attr.logical_name.clone(), attr);
        }
        self
    }

    /// Mark as relationship row type (no owner, no states).
    pub fn intersect(mut self) -> Self {
        self.is_intersect = true;
        self.ownership = OwnershipType::None;
        self.states.clear();
        self
    }

    /// Remove states.
    pub fn stateless(mut self) -> Self {
        self.states.clear();
        self
    }

    /// Mark as a person type with a computed `fullname`.
    pub fn person(mut self) -> Self {
        self.is_person = true;
        for name in ["firstname", "middlename", "lastname", "fullname"] {
            self.attributes
                .entry(name.to_string())
                .or_insert_with(|| AttributeDef::string(name));
        }
        self
    }

    /// Replace the declared states.
    pub fn states(mut self, states: Vec<StateDef>, default_state: i32) -> Self {
        self.states = states;
        self.default_state = default_state;
        self
    }

    /// Declare an attribute.
    pub fn attribute(mut self, def: AttributeDef) -> Self {
        self.attributes.insert(def.logical_name.clone(), def);
        self
    }

    /// Declare several attributes.
    pub fn attributes(mut self, defs: impl IntoIterator<Item = AttributeDef>) -> Self {
        for def in defs {
            self.attributes.insert(def.logical_name.clone(), def);
        }
        self
    }

    /// Declare an alternate key.
    pub fn alternate_key(mut self, name: &str, attributes: &[&str]) -> Self {
        self.alternate_keys.push(AlternateKey {
            name: name.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Declare a conditionally-required group.
    pub fn requires(mut self, attributes: &[&str], message: &str) -> Self {
        self.required_groups.push(RequiredGroup {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            message: message.to_string(),
        });
        self
    }

    /// Pin the primary name attribute.
    pub fn primary_name(mut self, attribute: &str) -> Self {
        self.name_override = Some(attribute.to_string());
        self
    }

    /// Declared attribute by name.
    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.get(name)
    }

    /// True when the type owns user/team owner fields.
    pub fn has_owner(&self) -> bool {
        self.ownership == OwnershipType::UserOwned
    }

    /// Declared state by code.
    pub fn state(&self, value: i32) -> Option<&StateDef> {
        self.states.iter().find(|s| s.value == value)
    }

    /// State a status reason belongs to.
    pub fn state_for_status(&self, status: i32) -> Option<&StateDef> {
        self.states.iter().find(|s| s.has_status(status))
    }

    /// State assigned on create.
    pub fn initial_state(&self) -> Option<&StateDef> {
        self.state(self.default_state).or_else(|| self.states.first())
    }

    /// Declared key whose attribute set equals `attributes` (order-insensitive).
    pub fn key_for(&self, attributes: &[&str]) -> Option<&AlternateKey> {
        self.alternate_keys.iter().find(|k| {
            k.attributes.len() == attributes.len()
                && k.attributes.iter().all(|a| attributes.contains(&a.as_str()))
        })
    }

    /// Display label of an option, state or status value.
    pub fn option_label(&self, attribute: &str, value: i32) -> Option<String> {
        match attribute {
            "statecode" => self.state(value).map(|s| s.label.clone()),
            "statuscode" => self
                .states
                .iter()
                .flat_map(|s| s.statuses.iter())
                .find(|o| o.value == value)
                .map(|o| o.label.clone()),
            _ => self
                .attributes
                .get(attribute)
                .and_then(|a| a.option_label(value))
                .map(str::to_string),
        }
    }

    /// Add system attributes and resolve the primary name.
    fn finalize(mut self, overrides: &BTreeMap<String, String>) -> Self {
        let id = self.primary_id_attribute.clone();
        self.attributes
            .entry(id.clone())
            .or_insert_with(|| AttributeDef::guid(&id));
        for attr in [
            AttributeDef::datetime("createdon"),
            AttributeDef::datetime("modifiedon"),
            AttributeDef::lookup("createdby", &["systemuser"]),
            AttributeDef::lookup("modifiedby", &["systemuser"]),
        ] {
            self.attributes.entry(attr.logical_name.clone()).or_insert(attr);
        }
        if !self.states.is_empty() {
            self.attributes
                .entry("statecode".into())
                .or_insert_with(|| AttributeDef::new("statecode", AttributeKind::State));
            self.attributes
                .entry("statuscode".into())
                .or_insert_with(|| AttributeDef::new("statuscode", AttributeKind::Status));
        }
        if self.has_owner() {
            let mut owner = AttributeDef::new("ownerid", AttributeKind::Owner);
            owner.targets = vec!["systemuser".into(), "team".into()];
            for attr in [
                owner,
                AttributeDef::lookup("owninguser", &["systemuser"]),
                AttributeDef::lookup("owningteam", &["team"]),
                AttributeDef::lookup("owningbusinessunit", &["businessunit"]),
            ] {
                self.attributes.entry(attr.logical_name.clone()).or_insert(attr);
            }
        }
        self.primary_name_attribute = match self.name_override.take() {
            Some(name) => name,
            None => resolve_primary_name(&self.logical_name, Some(&self.attributes), overrides),
        };
        self
    }

    /// Open-schema definition for an undeclared type.
    fn synthesize(logical_name: &str, overrides: &BTreeMap<String, String>) -> Self {
        let mut def = EntityDef::new(logical_name);
        def.declared = false;
        def.name_override = Some(resolve_primary_name(&def.logical_name, None, overrides));
        def.finalize(overrides)
    }
}

fn default_states() -> Vec<StateDef> {
    vec![
        StateDef::new(0, "Active", &[(1, "Active")]),
        StateDef::new(1, "Inactive", &[(2, "Inactive")]),
    ]
}

fn activity_states() -> Vec<StateDef> {
    vec![
        StateDef::new(0, "Open", &[(1, "Open")]),
        StateDef::new(1, "Completed", &[(2, "Completed")]),
        StateDef::new(2, "Canceled", &[(3, "Canceled")]),
    ]
}

/// Primary id attribute for a type.
pub fn primary_id_for(logical_name: &str) -> String {
    if IRREGULAR_ID_TYPES.contains(&logical_name) {
        ACTIVITY_ID.to_string()
    } else {
        format!("{}id", logical_name)
    }
}

/// Resolve the primary name attribute by fixed precedence.
///
/// Override table, then the 3-letter publisher prefix (`abc_thing` declares
/// `abc_name`), then `fullname`, then `name`, then `<prefix>_name` (or
/// `name` for unprefixed types). `declared` is `None` for open types.
pub fn resolve_primary_name(
    logical_name: &str,
    declared: Option<&BTreeMap<String, AttributeDef>>,
    overrides: &BTreeMap<String, String>,
) -> String {
    if let Some(name) = overrides.get(logical_name) {
        return name.clone();
    }
    let has = |attr: &str| declared.map(|d| d.contains_key(attr)).unwrap_or(false);
    let prefix = logical_name.split_once('_').map(|(p, _)| p);
    if let Some(p) = prefix {
        let candidate = format!("{}_name", p);
        if p.len() == 3 && has(&candidate) {
            return candidate;
        }
    }
    if has("fullname") {
        return "fullname".to_string();
    }
    if has("name") {
        return "name".to_string();
    }
    match prefix {
        Some(p) => format!("{}_name", p),
        None => "name".to_string(),
    }
}

// =============================================================================
// Relationships
// =============================================================================

/// Delete behavior of a one-to-many relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CascadePolicy {
    /// Delete referencing records
    Cascade,
    /// Clear the referencing lookup
    #[default]
    RemoveLink,
    /// Refuse the delete while references exist
    Restrict,
    /// Leave references untouched
    NoCascade,
}

/// Many-to-many relationship through an intersect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManyToMany {
    /// Relationship schema name
    pub schema_name: String,
    /// Intersect row type
    pub intersect_entity: String,
    /// First participating type
    pub entity1: String,
    /// Intersect attribute holding the first type's id
    pub entity1_attribute: String,
    /// Second participating type
    pub entity2: String,
    /// Intersect attribute holding the second type's id
    pub entity2_attribute: String,
}

/// One-to-many relationship through a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneToMany {
    /// Relationship schema name
    pub schema_name: String,
    /// Referenced (parent) type
    pub referenced_entity: String,
    /// Referenced attribute (primary id)
    pub referenced_attribute: String,
    /// Referencing (child) type
    pub referencing_entity: String,
    /// Lookup attribute on the child
    pub referencing_attribute: String,
    /// Delete behavior
    pub cascade_delete: CascadePolicy,
}

/// Relationship metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipDef {
    /// Many-to-many
    ManyToMany(ManyToMany),
    /// One-to-many
    OneToMany(OneToMany),
}

impl RelationshipDef {
    /// Many-to-many relationship.
    pub fn many_to_many(
        schema_name: &str,
        intersect_entity: &str,
        (entity1, entity1_attribute): (&str, &str),
        (entity2, entity2_attribute): (&str, &str),
    ) -> Self {
        RelationshipDef::ManyToMany(ManyToMany {
            schema_name: schema_name.to_string(),
            intersect_entity: intersect_entity.to_string(),
            entity1: entity1.to_string(),
            entity1_attribute: entity1_attribute.to_string(),
            entity2: entity2.to_string(),
            entity2_attribute: entity2_attribute.to_string(),
        })
    }

    /// One-to-many relationship keyed on the parent's primary id.
    pub fn one_to_many(
        schema_name: &str,
        referenced_entity: &str,
        (referencing_entity, referencing_attribute): (&str, &str),
        cascade_delete: CascadePolicy,
    ) -> Self {
        RelationshipDef::OneToMany(OneToMany {
            schema_name: schema_name.to_string(),
            referenced_entity: referenced_entity.to_string(),
            referenced_attribute: primary_id_for(referenced_entity),
            referencing_entity: referencing_entity.to_string(),
            referencing_attribute: referencing_attribute.to_string(),
            cascade_delete,
        })
    }

    /// Schema name.
    pub fn schema_name(&self) -> &str {
        match self {
            RelationshipDef::ManyToMany(m) => &m.schema_name,
            RelationshipDef::OneToMany(o) => &o.schema_name,
        }
    }

    /// True when `entity` participates.
    pub fn involves(&self, entity: &str) -> bool {
        match self {
            RelationshipDef::ManyToMany(m) => m.entity1 == entity || m.entity2 == entity,
            RelationshipDef::OneToMany(o) => {
                o.referenced_entity == entity || o.referencing_entity == entity
            }
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

static STANDARD: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(CatalogBuilder::standard().build()));

/// Immutable schema lookup table.
#[derive(Debug, Clone)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDef>,
    relationships: BTreeMap<String, RelationshipDef>,
    name_overrides: BTreeMap<String, String>,
}

impl Catalog {
    /// Shared catalog built from the standard table.
    pub fn standard() -> Arc<Catalog> {
        Arc::clone(&STANDARD)
    }

    /// Builder seeded with the standard table.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::standard()
    }

    /// Declared definition.
    pub fn get(&self, logical_name: &str) -> Option<&EntityDef> {
        self.entities.get(logical_name)
    }

    /// Declared definition, or an open definition synthesized on demand.
    pub fn entry(&self, logical_name: &str) -> Cow<'_, EntityDef> {
        match self.entities.get(logical_name) {
            Some(def) => Cow::Borrowed(def),
            None => Cow::Owned(EntityDef::synthesize(logical_name, &self.name_overrides)),
        }
    }

    /// True when the type is declared.
    pub fn is_declared(&self, logical_name: &str) -> bool {
        self.entities.contains_key(logical_name)
    }

    /// Primary id attribute of a type.
    pub fn primary_id_attribute(&self, logical_name: &str) -> String {
        match self.entities.get(logical_name) {
            Some(def) => def.primary_id_attribute.clone(),
            None => primary_id_for(logical_name),
        }
    }

    /// Primary name attribute of a type.
    pub fn primary_name_attribute(&self, logical_name: &str) -> String {
        match self.entities.get(logical_name) {
            Some(def) => def.primary_name_attribute.clone(),
            None => resolve_primary_name(logical_name, None, &self.name_overrides),
        }
    }

    /// Declared attribute of a declared type.
    pub fn attribute(&self, logical_name: &str, attribute: &str) -> Option<&AttributeDef> {
        self.entities.get(logical_name)?.attributes.get(attribute)
    }

    /// Relationship by schema name (case-insensitive).
    pub fn relationship(&self, schema_name: &str) -> Option<&RelationshipDef> {
        self.relationships
            .get(schema_name)
            .or_else(|| self.relationships.get(&schema_name.to_lowercase()))
            .or_else(|| {
                self.relationships
                    .values()
                    .find(|r| r.schema_name().eq_ignore_ascii_case(schema_name))
            })
    }

    /// Relationships the type participates in.
    pub fn relationships_for(&self, logical_name: &str) -> Vec<&RelationshipDef> {
        self.relationships
            .values()
            .filter(|r| r.involves(logical_name))
            .collect()
    }

    /// All relationships.
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDef> {
        self.relationships.values()
    }

    /// All declared types.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    /// Declared intersect types.
    pub fn intersect_entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values().filter(|e| e.is_intersect)
    }

    /// True for activity types (declared or on the irregular-id list).
    pub fn is_activity(&self, logical_name: &str) -> bool {
        match self.entities.get(logical_name) {
            Some(def) => def.is_activity,
            None => IRREGULAR_ID_TYPES.contains(&logical_name),
        }
    }
}

/// Builder for a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    entities: BTreeMap<String, EntityDef>,
    relationships: BTreeMap<String, RelationshipDef>,
    name_overrides: BTreeMap<String, String>,
}

impl CatalogBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded with the standard entities and relationships.
    pub fn standard() -> Self {
        let mut builder = Self::new();
        for (entity, attr) in standard::NAME_OVERRIDES {
            builder
                .name_overrides
                .insert(entity.to_string(), attr.to_string());
        }
        for def in standard::entities() {
            builder = builder.entity(def);
        }
        for rel in standard::relationships() {
            builder = builder.relationship(rel);
        }
        builder
    }

    /// Register or replace an entity definition.
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.insert(def.logical_name.clone(), def);
        self
    }

    /// Add an attribute to a registered (or new) entity.
    pub fn attribute(mut self, logical_name: &str, def: AttributeDef) -> Self {
        let entry = self
            .entities
            .entry(logical_name.to_string())
            .or_insert_with(|| EntityDef::new(logical_name));
        entry.attributes.insert(def.logical_name.clone(), def);
        self
    }

    /// Declare an alternate key on a registered (or new) entity.
    pub fn alternate_key(mut self, logical_name: &str, name: &str, attributes: &[&str]) -> Self {
        let entry = self
            .entities
            .remove(logical_name)
            .unwrap_or_else(|| EntityDef::new(logical_name));
        self.entities
            .insert(logical_name.to_string(), entry.alternate_key(name, attributes));
        self
    }

    /// Register a relationship.
    pub fn relationship(mut self, rel: RelationshipDef) -> Self {
        self.relationships
            .insert(rel.schema_name().to_lowercase(), rel);
        self
    }

    /// Override the primary name attribute of a type.
    pub fn primary_name_override(mut self, logical_name: &str, attribute: &str) -> Self {
        self.name_overrides
            .insert(logical_name.to_string(), attribute.to_string());
        self
    }

    /// Finalize definitions into an immutable catalog.
    pub fn build(self) -> Catalog {
        let overrides = self.name_overrides;
        let entities = self
            .entities
            .into_iter()
            .map(|(name, def)| (name, def.finalize(&overrides)))
            .collect();
        Catalog {
            entities,
            relationships: self.relationships,
            name_overrides: overrides,
        }
    }
}
