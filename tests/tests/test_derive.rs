// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use knot::{Error, Knot, KnotDefault, KnotObject, Serializer};
use std::collections::{BTreeMap, HashMap};

#[derive(KnotObject, Debug, PartialEq)]
struct Primitives {
    flag: bool,
    tiny: i8,
    small: u16,
    medium: i32,
    large: i64,
    unsigned: u64,
    ratio: f32,
    precise: f64,
    letter: char,
    nothing: (),
}

#[derive(KnotObject, Debug, PartialEq)]
struct Collections {
    names: Vec<String>,
    nested: Vec<Vec<i32>>,
    by_name: HashMap<String, u32>,
    ordered: BTreeMap<i64, Option<String>>,
    maybe: Option<Box<Collections>>,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Meters(f64);

#[derive(KnotObject, Debug, PartialEq)]
struct Marker;

#[derive(KnotObject, Debug, PartialEq)]
struct Cached {
    key: String,
    #[knot(skip)]
    hits: u32,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Wrapper<T> {
    inner: T,
    items: Vec<T>,
}

#[derive(KnotObject, Debug, PartialEq)]
enum Shape {
    Empty,
    Circle(f64),
    Rect { width: u32, height: u32 },
    #[knot(default)]
    Tagged {
        label: String,
        #[knot(skip)]
        cached_area: u64,
    },
}

#[derive(KnotObject, Debug, PartialEq)]
#[knot(no_default)]
struct Port(u16);

impl KnotDefault for Port {
    fn knot_default() -> Self {
        Port(8080)
    }
}

fn round_trip<T: Serializer>(knot: &Knot, value: &T) -> T {
    knot.deserialize(&knot.serialize(value).unwrap()).unwrap()
}

#[test]
fn test_primitives() {
    let knot = Knot::default();
    let value = Primitives {
        flag: true,
        tiny: -3,
        small: 65_000,
        medium: -123_456,
        large: i64::MAX,
        unsigned: u64::MAX,
        ratio: 0.5,
        precise: -1e300,
        letter: 'ß',
        nothing: (),
    };
    assert_eq!(round_trip(&knot, &value), value);
    assert_eq!(knot.copy(&value).unwrap(), value);
}

#[test]
fn test_collections() {
    let knot = Knot::default();
    let inner = Collections {
        names: vec![],
        nested: vec![vec![], vec![1, 2, 3]],
        by_name: HashMap::new(),
        ordered: BTreeMap::from([(-1, None)]),
        maybe: None,
    };
    let value = Collections {
        names: vec!["a".to_string(), "ü".to_string()],
        nested: vec![vec![i32::MIN]],
        by_name: HashMap::from([("x".to_string(), 1), ("y".to_string(), 2)]),
        ordered: BTreeMap::from([(5, Some("five".to_string())), (1, None)]),
        maybe: Some(Box::new(inner)),
    };
    assert_eq!(round_trip(&knot, &value), value);
    assert_eq!(knot.copy(&value).unwrap(), value);
}

#[test]
fn test_tuple_and_unit_structs() {
    let knot = Knot::default();
    let bytes = knot.serialize(&Marker).unwrap();
    assert_eq!(bytes, [0x11]);
    assert_eq!(knot.deserialize::<Marker>(&bytes).unwrap(), Marker);
    assert_eq!(round_trip(&knot, &Meters(12.5)), Meters(12.5));
}

#[test]
fn test_skipped_field() {
    let knot = Knot::default();
    let value = Cached {
        key: "k".to_string(),
        hits: 42,
    };
    let back = round_trip(&knot, &value);
    assert_eq!(back.key, "k");
    assert_eq!(back.hits, 0);
    assert_eq!(knot.copy(&value).unwrap().hits, 0);
}

#[test]
fn test_generic_struct() {
    let knot = Knot::default();
    let value = Wrapper {
        inner: "first".to_string(),
        items: vec!["second".to_string()],
    };
    assert_eq!(round_trip(&knot, &value), value);
    let numbers = Wrapper {
        inner: 1u64,
        items: vec![2, 3],
    };
    assert_eq!(round_trip(&knot, &numbers), numbers);
}

#[test]
fn test_enum_variants() {
    let knot = Knot::default();
    assert_eq!(knot.serialize(&Shape::Empty).unwrap(), [0x11, 0]);
    for shape in [
        Shape::Empty,
        Shape::Circle(2.0),
        Shape::Rect {
            width: 3,
            height: 4,
        },
    ] {
        assert_eq!(round_trip(&knot, &shape), shape);
    }
    let tagged = Shape::Tagged {
        label: "t".to_string(),
        cached_area: 9,
    };
    assert_eq!(
        round_trip(&knot, &tagged),
        Shape::Tagged {
            label: "t".to_string(),
            cached_area: 0
        }
    );
    assert_eq!(
        knot.copy(&Shape::Circle(1.0)).unwrap(),
        Shape::Circle(1.0)
    );
}

#[test]
fn test_enum_defaults_and_unknown_ordinal() {
    assert_eq!(
        Shape::knot_default(),
        Shape::Tagged {
            label: String::new(),
            cached_area: 0
        }
    );
    assert_eq!(Port::knot_default(), Port(8080));

    let knot = Knot::default();
    let err = knot.deserialize::<Shape>(&[0x11, 9]).unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}
