//! Inheritance mapping: how a class hierarchy is laid out in tables.

use serde::{Deserialize, Serialize};

use super::class_def::ClassDef;

/// How a subclass is mapped relative to its superclass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingStrategy {
    /// Each class has its own table holding its own properties, joined to
    /// the superclass table on the primary key.
    ClassTableInheritance,
    /// The whole hierarchy shares the superclass table. Rows are told apart
    /// by a discriminator column holding the class name.
    SingleTableInheritance { discriminator: String },
    /// Each concrete class table holds inherited properties too.
    ConcreteTableInheritance,
}

/// Superclass link of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inheritance {
    pub super_class: String,
    pub strategy: MappingStrategy,
}

/// One physical table of a class layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    /// Table name.
    pub table_name: String,
    /// Class whose properties introduced this table.
    pub class_name: String,
    /// Persisted properties stored in this table.
    pub props: Vec<String>,
    /// Primary-key columns present in this table.
    pub key_fields: Vec<String>,
}

/// Discriminator column and the value identifying a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub field_name: String,
    pub value: String,
}

/// Physical layout of a class.
///
/// `tables[0]` is the table the class is loaded from. Further tables exist
/// only under class-table inheritance and are joined on the key fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout {
    pub tables: Vec<TableMapping>,
    pub discriminator: Option<Discriminator>,
}

impl ClassLayout {
    /// The table the class is loaded from.
    pub fn primary(&self) -> &TableMapping {
        &self.tables[0]
    }

    /// Index of the table storing `prop`.
    pub fn table_index_of(&self, prop: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.props.iter().any(|p| p == prop))
    }
}

/// Lay out a class hierarchy.
///
/// `chain` is the class followed by its superclasses, nearest first.
/// `key_fields` are the column names of the hierarchy's primary key.
pub fn plan(chain: &[&ClassDef], key_fields: &[String]) -> ClassLayout {
    let persisted = |class: &ClassDef| -> Vec<String> {
        class
            .props
            .iter()
            .filter(|p| p.persisted)
            .map(|p| p.name.clone())
            .collect()
    };

    let mut tables = Vec::new();
    let mut discriminator = None;

    let Some((first, supers)) = chain.split_first() else {
        return ClassLayout {
            tables,
            discriminator,
        };
    };

    tables.push(TableMapping {
        table_name: first.table_name.clone(),
        class_name: first.name.clone(),
        props: persisted(first),
        key_fields: key_fields.to_vec(),
    });

    let mut current = 0;
    let mut class = *first;
    for super_class in supers {
        let Some(inheritance) = &class.inheritance else {
            break;
        };
        match &inheritance.strategy {
            MappingStrategy::ClassTableInheritance => {
                tables.push(TableMapping {
                    table_name: super_class.table_name.clone(),
                    class_name: super_class.name.clone(),
                    props: persisted(super_class),
                    key_fields: key_fields.to_vec(),
                });
                current = tables.len() - 1;
            }
            MappingStrategy::SingleTableInheritance {
                discriminator: field_name,
            } => {
                let table = &mut tables[current];
                table.table_name = super_class.table_name.clone();
                table.props.extend(persisted(super_class));
                if discriminator.is_none() {
                    discriminator = Some(Discriminator {
                        field_name: field_name.clone(),
                        value: first.name.clone(),
                    });
                }
            }
            MappingStrategy::ConcreteTableInheritance => {
                tables[current].props.extend(persisted(super_class));
            }
        }
        class = super_class;
    }

    ClassLayout {
        tables,
        discriminator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropDef, PropType};

    fn shape() -> ClassDef {
        ClassDef::new("Shape")
            .with_object_id("ShapeID")
            .with_prop(PropDef::new("ShapeName", PropType::String))
    }

    fn circle(strategy: MappingStrategy) -> ClassDef {
        ClassDef::new("Circle")
            .with_prop(PropDef::new("Radius", PropType::Int32))
            .with_super_class("Shape", strategy)
    }

    fn keys() -> Vec<String> {
        vec!["ShapeID".to_string()]
    }

    #[test]
    fn test_class_table_inheritance() {
        let shape = shape();
        let circle = circle(MappingStrategy::ClassTableInheritance);
        let layout = plan(&[&circle, &shape], &keys());

        assert_eq!(layout.tables.len(), 2);
        assert_eq!(layout.primary().table_name, "Circle");
        assert_eq!(layout.tables[1].table_name, "Shape");
        assert_eq!(layout.table_index_of("Radius"), Some(0));
        assert_eq!(layout.table_index_of("ShapeName"), Some(1));
        assert_eq!(layout.tables[1].key_fields, keys());
        assert!(layout.discriminator.is_none());
    }

    #[test]
    fn test_single_table_inheritance() {
        let shape = shape();
        let circle = circle(MappingStrategy::SingleTableInheritance {
            discriminator: "ShapeType".to_string(),
        });
        let layout = plan(&[&circle, &shape], &keys());

        assert_eq!(layout.tables.len(), 1);
        assert_eq!(layout.primary().table_name, "Shape");
        assert_eq!(layout.table_index_of("Radius"), Some(0));
        assert_eq!(layout.table_index_of("ShapeName"), Some(0));
        let discriminator = layout.discriminator.unwrap();
        assert_eq!(discriminator.field_name, "ShapeType");
        assert_eq!(discriminator.value, "Circle");
    }

    #[test]
    fn test_concrete_table_inheritance() {
        let shape = shape();
        let circle = circle(MappingStrategy::ConcreteTableInheritance);
        let layout = plan(&[&circle, &shape], &keys());

        assert_eq!(layout.tables.len(), 1);
        assert_eq!(layout.primary().table_name, "Circle");
        assert_eq!(layout.table_index_of("ShapeID"), Some(0));
        assert!(layout.discriminator.is_none());
    }

    #[test]
    fn test_non_persisted_props_have_no_table() {
        let class = ClassDef::new("Car")
            .with_object_id("CarID")
            .with_prop(PropDef::new("Display", PropType::String).not_persisted());
        let layout = plan(&[&class], &["CarID".to_string()]);
        assert_eq!(layout.table_index_of("Display"), None);
        assert_eq!(layout.table_index_of("CarID"), Some(0));
    }
}
