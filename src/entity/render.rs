//! Debug renderings of an entity and its facts.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::Entity;
use crate::primitive::PrimitiveKind;

impl Entity {
    /// Returns the entity's facts as a flat map.
    ///
    /// The map holds `_id`, `_type` and one entry per relation. When a
    /// relation has several values the last one wins; identifiers appear as
    /// their id strings. Intended for logging and inspection, not interchange.
    #[must_use]
    pub fn to_dictionary(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("_id".to_string(), Value::String(self.id.clone()));
        map.insert("_type".to_string(), Value::String(self.type_name.clone()));
        for fact in self.context.facts_of(&self.id, None) {
            map.insert(fact.relation, fact.value.to_json_value());
        }
        map
    }

    /// Renders the entity and everything it references as nested JSON.
    ///
    /// Referenced entities are rendered inline: one value as an object, several
    /// as an array. References to entities not registered in the context
    /// render as `null`. An entity already rendered elsewhere in the tree
    /// renders as the string `"Circular reference: <id>"`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        self.render(&mut seen)
    }

    fn render(&self, seen: &mut HashSet<String>) -> Value {
        if !seen.insert(self.id.clone()) {
            return Value::String(format!("Circular reference: {}", self.id));
        }

        let mut map = Map::new();
        map.insert("_id".to_string(), Value::String(self.id.clone()));
        map.insert("_type".to_string(), Value::String(self.type_name.clone()));

        // Relation name -> referenced ids, in first-seen relation order.
        let mut references: Vec<(String, Vec<String>)> = Vec::new();
        for fact in self.context.facts_of(&self.id, None) {
            if fact.value.kind() != PrimitiveKind::Identifier {
                map.insert(fact.relation, fact.value.to_json_value());
                continue;
            }

            let Ok(target) = fact.value.as_identifier() else {
                continue;
            };
            match references.iter_mut().find(|(rel, _)| *rel == fact.relation) {
                Some((_, ids)) => ids.push(target.to_string()),
                None => references.push((fact.relation.clone(), vec![target.to_string()])),
            }
        }

        for (relation, ids) in references {
            let mut rendered: Vec<Value> = ids
                .iter()
                .map(|id| {
                    self.context
                        .get_entity_in_memory(id)
                        .map_or(Value::Null, |entity| entity.render(seen))
                })
                .collect();
            let value = if rendered.len() == 1 {
                rendered.remove(0)
            } else {
                Value::Array(rendered)
            };
            map.insert(relation, value);
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::context::KnowledgeContext;
    use crate::entity::Entity;
    use crate::entity_type;

    entity_type! {
        pub struct Person: "http://schema.org/Person";
    }

    #[test]
    fn test_dictionary_last_value_wins() {
        let ctx = KnowledgeContext::new();
        let p = Person::with_id(&ctx, "mem://p");
        p.text("nick").add("a");
        p.text("nick").add("b");
        p.number("age").set(30.0);
        p.boolean("alive").set(true);

        let dict = p.to_dictionary();
        assert_eq!(dict["_id"], json!("mem://p"));
        assert_eq!(dict["_type"], json!("http://schema.org/Person"));
        assert_eq!(dict["nick"], json!("b"));
        assert_eq!(dict["age"], json!(30.0));
        assert_eq!(dict["alive"], json!(true));
    }

    #[test]
    fn test_dictionary_lists_ids_not_entities() {
        let ctx = KnowledgeContext::new();
        let a = Person::with_id(&ctx, "mem://a");
        let b = Person::with_id(&ctx, "mem://b");
        a.reference::<Person>("spouse").set(&b);
        assert_eq!(a.to_dictionary()["spouse"], json!("mem://b"));
    }

    #[test]
    fn test_json_nests_and_marks_cycles() {
        let ctx = KnowledgeContext::new();
        let a = Person::with_id(&ctx, "mem://a");
        let b = Person::with_id(&ctx, "mem://b");
        a.text("name").set("Ann");
        b.text("name").set("Bob");
        a.reference::<Person>("spouse").set(&b);
        b.reference::<Person>("spouse").set(&a);

        let rendered = a.to_json();
        assert_eq!(
            rendered,
            json!({
                "_id": "mem://a",
                "_type": "http://schema.org/Person",
                "name": "Ann",
                "spouse": {
                    "_id": "mem://b",
                    "_type": "http://schema.org/Person",
                    "name": "Bob",
                    "spouse": "Circular reference: mem://a"
                }
            })
        );
    }

    #[test]
    fn test_json_arrays_and_missing_references() {
        let ctx = KnowledgeContext::new();
        let parent = Person::with_id(&ctx, "mem://parent");
        let child = Entity::with_id(&ctx, "http://schema.org/Person", "mem://child");
        parent.reference::<Person>("children").add(&child);
        parent
            .reference::<Person>("children")
            .add(&crate::EntityReference::<Person>::new("people://unknown"));
        parent
            .reference::<Person>("sponsor")
            .add(&crate::EntityReference::<Person>::new("people://gone"));

        let rendered = parent.to_json();
        let children = rendered["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["_id"], json!("mem://child"));
        assert_eq!(children[1], serde_json::Value::Null);
        assert_eq!(rendered["sponsor"], serde_json::Value::Null);
    }
}
