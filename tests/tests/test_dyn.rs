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

use knot_core::error::Error;
use knot_core::resolver::context::{ReadContext, WriteContext};
use knot_core::serializer::{downcast_rc, CustomSerializer, DynObject};
use knot_core::Knot;
use knot_derive::KnotObject;
use std::rc::Rc;

#[derive(KnotObject, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Temperature {
    celsius: i32,
}

struct AsText;

impl CustomSerializer<Temperature> for AsText {
    fn write(value: &Temperature, context: &mut WriteContext) -> Result<(), Error> {
        context.writer.write_str(&format!("{}C", value.celsius))?;
        Ok(())
    }

    fn read(context: &mut ReadContext) -> Result<Temperature, Error> {
        let text = context.reader.read_str()?;
        text.trim_end_matches('C')
            .parse()
            .map(|celsius| Temperature { celsius })
            .map_err(|_| Error::invalid_data(format!("not a temperature: {text}")))
    }
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}

#[test]
fn test_builtin_class_id() {
    let knot = Knot::default();
    let value: Box<dyn DynObject> = Box::new(5i32);
    let bytes = knot.serialize(&value).unwrap();
    // i32 is registration id 3, written as 3 + 2
    assert_eq!(bytes, [0x11, 5, 10]);

    let back: Box<dyn DynObject> = knot.deserialize(&bytes).unwrap();
    assert_eq!((*back).downcast_ref::<i32>(), Some(&5));
}

#[test]
fn test_unregistered_type_written_by_name_once() {
    let writer = Knot::default();
    let values: Vec<Box<dyn DynObject>> = vec![
        Box::new(Point { x: 1, y: 2 }),
        Box::new(Point { x: 3, y: 4 }),
        Box::new("text".to_string()),
    ];
    let bytes = writer.serialize(&values).unwrap();
    assert_eq!(count(&bytes, b"Point"), 1);

    let mut reader = Knot::default();
    reader.register::<Point>().unwrap();
    let back: Vec<Box<dyn DynObject>> = reader.deserialize(&bytes).unwrap();
    assert_eq!((*back[1]).downcast_ref::<Point>(), Some(&Point { x: 3, y: 4 }));
    assert_eq!((*back[2]).downcast_ref::<String>().unwrap(), "text");
}

#[test]
fn test_unknown_class_name() {
    let mut writer = Knot::default();
    writer.register_by_name::<Point>("geo.Point").unwrap();
    let value: Box<dyn DynObject> = Box::new(Point { x: 0, y: 0 });
    let bytes = writer.serialize(&value).unwrap();
    assert_eq!(count(&bytes, b"geo.Point"), 1);

    let err = Knot::default()
        .deserialize::<Box<dyn DynObject>>(&bytes)
        .err().unwrap();
    assert!(matches!(err, Error::UnknownClass(_)));

    let mut reader = Knot::default();
    reader.register_by_name::<Point>("geo.Point").unwrap();
    let back: Box<dyn DynObject> = reader.deserialize(&bytes).unwrap();
    assert!((*back).is::<Point>());
}

#[test]
fn test_unknown_class_id() {
    let mut writer = Knot::default();
    writer.register_with_id::<Point>(100).unwrap();
    let value: Box<dyn DynObject> = Box::new(Point { x: 0, y: 0 });
    let bytes = writer.serialize(&value).unwrap();
    assert!(matches!(
        Knot::default().deserialize::<Box<dyn DynObject>>(&bytes),
        Err(Error::UnregisteredClass(_))
    ));
}

#[test]
fn test_closed_world_rejects_unregistered_dyn() {
    let knot = Knot::new().registration_required(true);
    let value: Box<dyn DynObject> = Box::new(Point { x: 0, y: 0 });
    assert!(matches!(
        knot.serialize(&value),
        Err(Error::UnregisteredClass(_))
    ));
}

#[test]
fn test_custom_serializer() {
    let mut knot = Knot::default();
    knot.register_serializer::<Temperature, AsText>().unwrap();
    let value: Box<dyn DynObject> = Box::new(Temperature { celsius: 21 });
    let bytes = knot.serialize(&value).unwrap();
    assert_eq!(count(&bytes, b"21C"), 1);

    let back: Box<dyn DynObject> = knot.deserialize(&bytes).unwrap();
    assert_eq!(
        (*back).downcast_ref::<Temperature>(),
        Some(&Temperature { celsius: 21 })
    );
}

#[test]
fn test_default_serializer() {
    let mut knot = Knot::default();
    knot.register_default_serializer::<Temperature, AsText>();
    assert!(knot.type_resolver().get::<Temperature>().is_none());

    let value: Box<dyn DynObject> = Box::new(Temperature { celsius: -4 });
    let bytes = knot.serialize(&value).unwrap();
    assert_eq!(count(&bytes, b"-4C"), 1);
    let back: Box<dyn DynObject> = knot.deserialize(&bytes).unwrap();
    assert_eq!(
        (*back).downcast_ref::<Temperature>(),
        Some(&Temperature { celsius: -4 })
    );
}

#[test]
fn test_shared_dyn_objects() {
    let mut knot = Knot::default();
    knot.register::<Point>().unwrap();
    let shared: Rc<dyn DynObject> = Rc::new(Point { x: 7, y: 8 });
    let values = vec![shared.clone(), shared];

    let back: Vec<Rc<dyn DynObject>> = knot.deserialize(&knot.serialize(&values).unwrap()).unwrap();
    assert!(Rc::ptr_eq(&back[0], &back[1]));
    let point = downcast_rc::<Point>(back[0].clone()).ok().unwrap();
    assert_eq!(*point, Point { x: 7, y: 8 });
    assert!(downcast_rc::<String>(back[1].clone()).is_err());
}

#[test]
fn test_optional_dyn_object() {
    let knot = Knot::default();
    let values: Vec<Option<Box<dyn DynObject>>> = vec![None, Some(Box::new(1u8))];
    let bytes = knot.serialize(&values).unwrap();
    let back: Vec<Option<Box<dyn DynObject>>> = knot.deserialize(&bytes).unwrap();
    assert!(back[0].is_none());
    assert_eq!((**back[1].as_ref().unwrap()).downcast_ref::<u8>(), Some(&1));
}

#[test]
fn test_copy_dyn_object() {
    let knot = Knot::default();
    let value: Box<dyn DynObject> = Box::new(Point { x: 1, y: 1 });
    let copy = knot.copy(&value).unwrap();
    assert_eq!((*copy).downcast_ref::<Point>(), Some(&Point { x: 1, y: 1 }));
}

#[derive(KnotObject)]
struct PointFirst {
    point: Rc<Point>,
    view: Rc<dyn DynObject>,
}

#[derive(KnotObject)]
struct ViewFirst {
    view: Rc<dyn DynObject>,
    point: Rc<Point>,
}

#[test]
fn test_allocation_seen_as_typed_then_dyn() {
    let mut knot = Knot::default();
    knot.register::<Point>().unwrap();
    let point = Rc::new(Point { x: 2, y: 3 });
    let value = PointFirst {
        point: point.clone(),
        view: point,
    };
    let bytes = knot.serialize(&value).unwrap();
    let back: PointFirst = knot.deserialize(&bytes).unwrap();
    let view = downcast_rc::<Point>(back.view.clone()).ok().unwrap();
    assert!(Rc::ptr_eq(&back.point, &view));

    let copy = knot.copy(&value).unwrap();
    let view = downcast_rc::<Point>(copy.view.clone()).ok().unwrap();
    assert!(Rc::ptr_eq(&copy.point, &view));
    assert!(!Rc::ptr_eq(&copy.point, &value.point));
}

#[test]
fn test_allocation_seen_as_dyn_then_typed() {
    let mut knot = Knot::default();
    knot.register::<Point>().unwrap();
    let point = Rc::new(Point { x: 5, y: 1 });
    let value = ViewFirst {
        view: point.clone(),
        point,
    };
    let bytes = knot.serialize(&value).unwrap();
    let back: ViewFirst = knot.deserialize(&bytes).unwrap();
    assert_eq!(*back.point, Point { x: 5, y: 1 });
    let view = downcast_rc::<Point>(back.view.clone()).ok().unwrap();
    assert!(Rc::ptr_eq(&back.point, &view));

    let copy = knot.copy(&value).unwrap();
    let view = downcast_rc::<Point>(copy.view.clone()).ok().unwrap();
    assert!(Rc::ptr_eq(&copy.point, &view));
}
