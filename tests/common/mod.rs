//! Shared schema.org-style entity types for the integration tests.

#![allow(dead_code)]

use knowledge_context::{
    entity_type, BooleanField, Entity, NumberField, ReferenceField, TextField, TimeField,
};

pub const THING: &str = "http://schema.org/Thing";
pub const PLACE: &str = "http://schema.org/Place";
pub const ORGANIZATION: &str = "http://schema.org/Organization";

entity_type! {
    pub struct Thing: "http://schema.org/Thing";
}

entity_type! {
    pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct City: "http://schema.org/City"
        extends ["http://schema.org/Place", "http://schema.org/Thing"];
}

entity_type! {
    pub struct Organization: "http://schema.org/Organization" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct LocalBusiness: "http://schema.org/LocalBusiness"
        extends ["http://schema.org/Place", "http://schema.org/Organization", "http://schema.org/Thing"];
}

entity_type! {
    pub struct SportsActivityLocation: "http://schema.org/SportsActivityLocation"
        extends [
            "http://schema.org/LocalBusiness",
            "http://schema.org/Place",
            "http://schema.org/Organization",
            "http://schema.org/Thing",
        ];
}

entity_type! {
    pub struct ExerciseGym: "http://schema.org/ExerciseGym"
        extends [
            "http://schema.org/SportsActivityLocation",
            "http://schema.org/LocalBusiness",
            "http://schema.org/Place",
            "http://schema.org/Organization",
            "http://schema.org/Thing",
        ];
}

entity_type! {
    pub struct Person: "http://schema.org/Person" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct QuantitativeValue: "http://schema.org/QuantitativeValue" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct PostalAddress: "http://schema.org/PostalAddress" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct GenderType: "http://schema.org/GenderType" extends ["http://schema.org/Thing"];
}

entity_type! {
    /// The enumerated value `Male` of `GenderType`.
    pub struct Male: "http://schema.org/GenderType"
        extends ["http://schema.org/Thing"]
        singleton "enum://http://schema.org/Male";
}

entity_type! {
    /// The enumerated value `Female` of `GenderType`.
    pub struct Female: "http://schema.org/GenderType"
        extends ["http://schema.org/Thing"]
        singleton "enum://http://schema.org/Female";
}

/// Fields shared by everything derived from `Thing`.
pub trait ThingFields {
    fn as_entity(&self) -> &Entity;

    fn name(&self) -> TextField {
        self.as_entity().text("name")
    }

    fn description(&self) -> TextField {
        self.as_entity().text("description")
    }
}

impl ThingFields for Entity {
    fn as_entity(&self) -> &Entity {
        self
    }
}

macro_rules! thing_fields {
    ($($ty:ty),*) => {
        $(
            impl ThingFields for $ty {
                fn as_entity(&self) -> &Entity {
                    self
                }
            }
        )*
    };
}

thing_fields!(
    Thing,
    Place,
    City,
    Organization,
    LocalBusiness,
    SportsActivityLocation,
    ExerciseGym,
    Person,
    QuantitativeValue,
    PostalAddress,
    GenderType,
    Male,
    Female
);

impl Person {
    pub fn birth_date(&self) -> TimeField {
        self.time("birthDate")
    }

    pub fn telephone(&self) -> TextField {
        self.text("telephone")
    }

    pub fn parent(&self) -> ReferenceField<Person> {
        self.reference("parent")
    }

    pub fn height(&self) -> ReferenceField<QuantitativeValue> {
        self.reference("height")
    }

    pub fn weight(&self) -> ReferenceField<QuantitativeValue> {
        self.reference("weight")
    }

    pub fn gender(&self) -> ReferenceField<GenderType> {
        self.reference("gender")
    }

    pub fn address(&self) -> ReferenceField<PostalAddress> {
        self.reference("address")
    }
}

impl QuantitativeValue {
    pub fn value_as_number(&self) -> NumberField {
        self.number("value")
    }

    pub fn value_as_bool(&self) -> BooleanField {
        self.boolean("value")
    }

    pub fn value_as_string(&self) -> TextField {
        self.text("value")
    }
}

impl PostalAddress {
    pub fn address_locality(&self) -> TextField {
        self.text("addressLocality")
    }
}

impl Place {
    pub fn geo_as_place(&self) -> ReferenceField<Place> {
        self.reference("geo")
    }

    pub fn geo_as_person(&self) -> ReferenceField<Person> {
        self.reference("geo")
    }
}
