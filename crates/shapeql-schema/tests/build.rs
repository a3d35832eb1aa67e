use std::collections::{BTreeMap, HashMap};

use shapeql_schema::{
    BuildError, EnumTable, NativeField, NativeKind, NativeType, Reflect, Schema, TypeKind,
};

struct Ctx;

impl Reflect for Ctx {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Context)
    }
}

struct Failure;

impl Reflect for Failure {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Error)
    }
}

struct Query;

impl Reflect for Query {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![
                NativeField::new("message", "", String::native_type),
                NativeField::new(
                    "random",
                    "random(low: Int = 1, high: Int = 6)",
                    <fn(Ctx, i32, i32) -> Result<i32, Failure>>::native_type,
                ),
                NativeField::new("internal", "-", String::native_type),
            ],
        )
    }
}

fn build<Q: Reflect>(enums: &EnumTable) -> Result<Schema, BuildError> {
    Schema::builder(enums).query::<Q>().finish()
}

#[test]
fn hello() {
    let schema = build::<Query>(&EnumTable::new()).unwrap();

    insta::assert_snapshot!(schema.sdl(), @r###"
    type Query {
      message: String!
      random(low: Int! = 1, high: Int! = 6): Int!
    }

    schema {
      query: Query
    }
    "###);
}

#[test]
fn builds_are_deterministic() {
    let enums = EnumTable::new().with_enum("Color", ["RED", "GREEN"]).unwrap();
    let first = build::<Zoo>(&enums).unwrap();
    let second = build::<Zoo>(&enums).unwrap();
    assert_eq!(first.sdl(), second.sdl());
}

struct Point;

impl Reflect for Point {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Point",
            vec![
                NativeField::new("x", "", f64::native_type),
                NativeField::new("y", "", f64::native_type),
            ],
        )
    }
}

struct Geometry;

impl Reflect for Geometry {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Geometry",
            vec![
                NativeField::new("origin", "", Point::native_type),
                NativeField::new("move", "move(to)", <fn(Point) -> Point>::native_type),
            ],
        )
    }
}

#[test]
fn input_and_output_reuse_conflicts() {
    let err = build::<Geometry>(&EnumTable::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "same name used for different GraphQL types: Point is used as both object and input"
    );
}

struct Shapes;

impl Reflect for Shapes {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Shapes",
            vec![
                NativeField::new("origin", "", Point::native_type),
                NativeField::new("points", "", <Vec<Option<Point>>>::native_type),
                NativeField::new("center", ",nullable", Point::native_type),
            ],
        )
    }
}

#[test]
fn consistent_reuse_is_deduplicated() {
    let schema = build::<Shapes>(&EnumTable::new()).unwrap();

    insta::assert_snapshot!(schema.sdl(), @r###"
    type Point {
      x: Float!
      y: Float!
    }

    type Shapes {
      origin: Point!
      points: [Point]!
      center: Point
    }

    schema {
      query: Shapes
    }
    "###);
}

struct Palette;

impl Reflect for Palette {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![
                NativeField::new("favorite", "favorite:Color", i32::native_type),
                NativeField::new(
                    "paint",
                    "paint(colors:Color=[RED, BLUE] # what to paint with)",
                    <fn(Vec<i32>) -> bool>::native_type,
                ),
            ],
        )
    }
}

#[test]
fn enums() {
    let enums = EnumTable::new()
        .with_enum("Color", ["RED", "GREEN # grass", "BLUE"])
        .unwrap();
    let schema = build::<Palette>(&enums).unwrap();

    let color = schema.type_node("Color").unwrap();
    assert_eq!(color.kind, TypeKind::Enum);
    assert_eq!(color.enum_value(1).map(|value| value.name.as_str()), Some("GREEN"));
    assert_eq!(color.enum_ordinal("BLUE"), Some(2));
    assert_eq!(color.enum_value(3), None);

    insta::assert_snapshot!(schema.sdl(), @r###"
    enum Color {
      RED
      """
      grass
      """
      GREEN
      BLUE
    }

    type Query {
      favorite: Color!
      paint(
        """
        what to paint with
        """
        colors: [Color!]! = [RED, BLUE]
      ): Boolean!
    }

    schema {
      query: Query
    }
    "###);
}

struct BadPalette;

impl Reflect for BadPalette {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![NativeField::new(
                "paint",
                "paint(colors:Color=[RED, PURPLE])",
                <fn(Vec<i32>) -> bool>::native_type,
            )],
        )
    }
}

struct NullDefault;

impl Reflect for NullDefault {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![NativeField::new("bad", "bad(n: Int = null)", <fn(i32) -> i32>::native_type)],
        )
    }
}

struct OptionalNullDefault;

impl Reflect for OptionalNullDefault {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![NativeField::new("fine", "fine(n = null)", <fn(Option<i32>) -> i32>::native_type)],
        )
    }
}

#[test]
fn defaults_are_validated() {
    let enums = EnumTable::new().with_enum("Color", ["RED", "GREEN"]).unwrap();
    let err = build::<BadPalette>(&enums).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Query.paint(colors): invalid default value [RED, PURPLE]: PURPLE is not a value of Color"
    );

    let err = build::<NullDefault>(&enums).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Query.bad(n): invalid default value null: null is not a valid Int!"
    );

    let schema = build::<OptionalNullDefault>(&enums).unwrap();
    insta::assert_snapshot!(schema.sdl(), @r###"
    type Query {
      fine(n: Int = null): Int!
    }

    schema {
      query: Query
    }
    "###);
}

struct WrappedOverride;

impl Reflect for WrappedOverride {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![NativeField::new("favorite", "favorite:Color!", i32::native_type)],
        )
    }
}

#[test]
fn type_overrides_cannot_carry_wrappers() {
    let enums = EnumTable::new().with_enum("Color", ["RED", "GREEN"]).unwrap();
    let err = build::<WrappedOverride>(&enums).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Query.favorite: malformed metadata \"favorite:Color!\": type override \"Color!\" must be a plain type name, wrappers follow the native type"
    );
}

struct Named;

impl Reflect for Named {
    fn native_type() -> NativeType {
        NativeType::record::<Self>("Named", vec![NativeField::new("name", "", String::native_type)])
    }
}

struct Pet;

impl Reflect for Pet {
    fn native_type() -> NativeType {
        NativeType::record::<Self>("Pet", Vec::new())
    }
}

struct Dog;

impl Reflect for Dog {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Dog",
            vec![
                NativeField::embedded("named", Named::native_type),
                NativeField::new("barks", "", bool::native_type),
                NativeField::embedded("pet", Pet::native_type),
            ],
        )
    }
}

struct Cat;

impl Reflect for Cat {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Cat",
            vec![
                NativeField::embedded("named", Named::native_type),
                NativeField::embedded("pet", Pet::native_type),
                NativeField::new("lives", "", u8::native_type),
            ],
        )
    }
}

struct Zoo;

impl Reflect for Zoo {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![
                NativeField::new("dog", "", Dog::native_type),
                NativeField::new("cat", "", Cat::native_type),
                NativeField::new("favorite", "favorite:Pet", Pet::native_type),
                NativeField::new("color", "color:Color", i32::native_type),
            ],
        )
    }
}

#[test]
fn embedding_makes_interfaces_and_unions() {
    let enums = EnumTable::new().with_enum("Color", ["RED", "GREEN"]).unwrap();
    let schema = build::<Zoo>(&enums).unwrap();

    assert!(schema.is_possible_type("Named", "Dog"));
    assert!(schema.is_possible_type("Pet", "Cat"));
    assert!(!schema.is_possible_type("Pet", "Named"));
    assert_eq!(
        schema.object_for(std::any::TypeId::of::<Dog>()).map(|node| node.name.as_str()),
        Some("Dog")
    );

    insta::assert_snapshot!(schema.sdl(), @r###"
    type Cat implements Named {
      name: String!
      lives: Int!
    }

    enum Color {
      RED
      GREEN
    }

    type Dog implements Named {
      name: String!
      barks: Boolean!
    }

    interface Named {
      name: String!
    }

    union Pet = Cat | Dog

    type Query {
      dog: Dog!
      cat: Cat!
      favorite: Pet!
      color: Color!
    }

    schema {
      query: Query
    }
    "###);
}

struct Clash;

impl Reflect for Clash {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Clash",
            vec![
                NativeField::embedded("named", Named::native_type),
                NativeField::new("name", "", String::native_type),
            ],
        )
    }
}

#[test]
fn inherited_field_names_must_be_unique() {
    let err = build::<Clash>(&EnumTable::new()).unwrap_err();
    assert_eq!(err, BuildError::DuplicateField {
        owner: "Clash".into(),
        name: "name".into(),
    });
}

struct Tree;

impl Reflect for Tree {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Tree",
            vec![
                NativeField::new("value", "", i64::native_type),
                NativeField::new("children", "", <Vec<Tree>>::native_type),
                NativeField::new("parent", "", <Option<Box<Tree>>>::native_type),
            ],
        )
    }
}

#[test]
fn self_referential_types() {
    let schema = build::<Tree>(&EnumTable::new()).unwrap();

    insta::assert_snapshot!(schema.sdl(), @r###"
    type Tree {
      value: Int!
      children: [Tree!]!
      parent: Tree
    }

    schema {
      query: Tree
    }
    "###);
}

struct Item;

impl Reflect for Item {
    fn native_type() -> NativeType {
        NativeType::record::<Self>("Item", vec![NativeField::new("label", "", String::native_type)])
    }
}

struct Inventory;

impl Reflect for Inventory {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![
                NativeField::new("items", "items,id_field", <BTreeMap<String, Item>>::native_type),
                NativeField::new("item", "item,subscript", <HashMap<String, Item>>::native_type),
                NativeField::new("shelf", "shelf,subscript=position", <Vec<Item>>::native_type),
            ],
        )
    }
}

#[test]
fn collections_with_keys() {
    let schema = build::<Inventory>(&EnumTable::new()).unwrap();

    insta::assert_snapshot!(schema.sdl(), @r###"
    type Item {
      label: String!
      id: String!
    }

    type Query {
      items: [Item!]!
      item(id: String!): Item!
      shelf(position: Int!): Item!
    }

    schema {
      query: Query
    }
    "###);
}

struct Anonymous;

impl Reflect for Anonymous {
    fn native_type() -> NativeType {
        NativeType::record::<Self>(
            "Query",
            vec![NativeField::new("home_address", "", Address::native_type)],
        )
    }
}

struct Address;

impl Reflect for Address {
    fn native_type() -> NativeType {
        NativeType::anonymous_record::<Self>(vec![NativeField::new("street", "", String::native_type)])
    }
}

#[test]
fn anonymous_records_are_named_after_their_field() {
    let schema = build::<Anonymous>(&EnumTable::new()).unwrap();
    assert_eq!(schema.type_node("HomeAddress").map(|node| node.kind), Some(TypeKind::Object));
}

struct Broken<const N: usize>;

impl<const N: usize> Reflect for Broken<N> {
    fn native_type() -> NativeType {
        let field = match N {
            0 => NativeField::new("f", "f(a)", <fn() -> i32>::native_type),
            1 => NativeField::new("f", "", <fn(i32) -> i32>::native_type),
            2 => NativeField::new("f", "", <fn() -> (i32, String)>::native_type),
            3 => NativeField::new("f", "f:Colour", i32::native_type),
            4 => NativeField::new("f", "__f", i32::native_type),
            5 => NativeField::new("f", "f(a", i32::native_type),
            6 => NativeField::new("f", "f(a = \"x\")", <fn(i32) -> i32>::native_type),
            7 => NativeField::new("f", "", <Vec<fn() -> i32>>::native_type),
            _ => NativeField::new("f", "", <fn() -> ()>::native_type),
        };
        NativeType::record::<Self>("Query", vec![field])
    }
}

#[test]
fn structural_problems_abort_the_build() {
    let enums = EnumTable::new();
    let messages = [
        build::<Broken<0>>(&enums),
        build::<Broken<1>>(&enums),
        build::<Broken<2>>(&enums),
        build::<Broken<3>>(&enums),
        build::<Broken<4>>(&enums),
        build::<Broken<5>>(&enums),
        build::<Broken<6>>(&enums),
        build::<Broken<7>>(&enums),
        build::<Broken<8>>(&enums),
    ]
    .into_iter()
    .map(|result| result.unwrap_err().to_string())
    .collect::<Vec<_>>();

    insta::assert_debug_snapshot!(messages, @r###"
    [
        "Query.f: metadata declares 1 arguments but the function takes 0",
        "Query.f: metadata declares 0 arguments but the function takes 1",
        "Query.f: the second result of a resolver must be an error",
        "Query.f: unknown type Colour",
        "Query.f: invalid name \"__f\"",
        "Query.f: malformed metadata \"f(a\": unbalanced brackets or quotes in \"f(a\"",
        "Query.f(a): invalid default value \"x\": \"x\" is not a valid Int",
        "Query.f: cannot resolve the element type of sequence of function",
        "Query.f: function has no return value",
    ]
    "###);
}

#[test]
fn a_query_root_is_required() {
    let err = Schema::builder(&EnumTable::new()).finish().unwrap_err();
    assert_eq!(err, BuildError::MissingQuery);
}
