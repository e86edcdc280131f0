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
use knot_core::serializer::{DynObject, Serializer};
use knot_core::{CopyContext, ImportPolicy, Knot, ReadContext, TypeResolver, WriteContext};
use knot_derive::KnotObject;
use std::sync::Arc;

#[derive(KnotObject, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Line {
    start: Point,
    end: Point,
}

#[derive(KnotObject, Debug, PartialEq)]
struct Label(String);

#[test]
fn test_closed_world_requires_registration() {
    let mut knot = Knot::new().registration_required(true);
    let point = Point { x: 1, y: -1 };
    assert!(matches!(
        knot.serialize(&point),
        Err(Error::UnregisteredClass(_))
    ));

    knot.register::<Point>().unwrap();
    let back: Point = knot.deserialize(&knot.serialize(&point).unwrap()).unwrap();
    assert_eq!(back, point);
}

#[test]
fn test_closed_world_checks_nested_types() {
    let mut knot = Knot::new().registration_required(true);
    knot.register::<Line>().unwrap();
    let line = Line {
        start: Point { x: 0, y: 0 },
        end: Point { x: 3, y: 4 },
    };
    let err = knot.serialize(&line).unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnregisteredClass(_)));
    assert_eq!(err.trace(), ["start (Line)"]);
}

#[test]
fn test_closed_world_read_side() {
    let bytes = Knot::default().serialize(&Label("l".to_string())).unwrap();
    let reader = Knot::new().registration_required(true);
    assert!(matches!(
        reader.deserialize::<Label>(&bytes),
        Err(Error::UnregisteredClass(_))
    ));
}

#[test]
fn test_ids_follow_builtins() {
    let mut knot = Knot::default();
    let point = knot.register::<Point>().unwrap();
    let line = knot.register::<Line>().unwrap();
    assert_eq!(point.id(), 13);
    assert_eq!(line.id(), 14);

    // re-registration keeps the id and the order
    let again = knot.register::<Point>().unwrap();
    assert_eq!(again.id(), 13);
    assert_eq!(again.order(), point.order());
    assert_eq!(knot.type_resolver().get::<Point>().unwrap().id(), 13);
}

#[test]
fn test_explicit_id_evicts_holder() {
    let mut knot = Knot::default();
    knot.register_with_id::<Point>(100).unwrap();
    knot.register_with_id::<Line>(100).unwrap();
    let resolver = knot.type_resolver();
    assert!(resolver.get::<Point>().is_none());
    assert_eq!(resolver.get_by_id(100).unwrap().type_id(), std::any::TypeId::of::<Line>());
    assert!(knot.register_with_id::<Label>(-3).is_err());
}

#[test]
fn test_register_by_name() {
    let mut knot = Knot::default();
    let registration = knot.register_by_name::<Point>("geo.Point").unwrap();
    assert!(registration.is_named());
    assert_eq!(registration.type_name(), "geo.Point");
    assert!(knot.type_resolver().get_by_name("geo.Point").is_some());
    assert!(knot.register_by_name::<Line>("").is_err());
}

#[test]
fn test_set_type_resolver_imports() {
    let mut knot = Knot::default();
    knot.register::<Point>().unwrap();
    let cutoff = knot.type_resolver().registration_count();
    knot.register::<Line>().unwrap();

    knot.set_type_resolver(TypeResolver::empty(), ImportPolicy::Before(cutoff));
    let resolver = knot.type_resolver();
    assert_eq!(resolver.get::<i32>().unwrap().id(), 3);
    assert_eq!(resolver.get::<Point>().unwrap().id(), 13);
    assert!(resolver.get::<Line>().is_none());

    let mut cleared = Knot::default();
    cleared.register::<Point>().unwrap();
    cleared.set_type_resolver(TypeResolver::empty(), ImportPolicy::None);
    assert!(cleared.type_resolver().is_empty());
}

#[test]
fn test_shared_resolver_between_engines() {
    let mut writer = Knot::default();
    writer.register::<Point>().unwrap();
    let reader = Knot::new()
        .registration_required(true)
        .with_type_resolver(writer.shared_type_resolver());
    assert!(Arc::ptr_eq(
        &writer.shared_type_resolver(),
        &reader.shared_type_resolver()
    ));
    let point = Point { x: 9, y: 8 };
    let back: Point = reader.deserialize(&writer.serialize(&point).unwrap()).unwrap();
    assert_eq!(back, point);
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn test_class_names_kept_between_calls() {
    let writer = Knot::new().auto_reset(false);
    let value: Box<dyn DynObject> = Box::new(Point { x: 1, y: 2 });
    let first = writer.serialize(&value).unwrap();
    let second = writer.serialize(&value).unwrap();
    assert!(contains(&first, b"Point"));
    assert!(!contains(&second, b"Point"));
    assert!(second.len() < first.len());

    let mut reader = Knot::new().auto_reset(false);
    reader.register::<Point>().unwrap();
    for bytes in [&first, &second] {
        let back: Box<dyn DynObject> = reader.deserialize(bytes).unwrap();
        assert_eq!((*back).downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
    }

    writer.reset();
    assert_eq!(writer.serialize(&value).unwrap(), first);
}

#[test]
fn test_class_names_cleared_by_default() {
    let knot = Knot::default();
    let value: Box<dyn DynObject> = Box::new(Point { x: 1, y: 2 });
    let first = knot.serialize(&value).unwrap();
    assert_eq!(knot.serialize(&value).unwrap(), first);
}

/// Timestamps written as the distance from the previous one in the same graph.
#[derive(Debug, PartialEq)]
struct Stamp(i64);

const LAST_STAMP: &str = "last-stamp";

impl Serializer for Stamp {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        let last = context.graph_context().get::<i64>(LAST_STAMP).copied();
        context
            .writer
            .write_var_i64(self.0 - last.unwrap_or(0), false)?;
        context.graph_context_mut().insert(LAST_STAMP, self.0);
        Ok(())
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        let last = context.graph_context().get::<i64>(LAST_STAMP).copied();
        let stamp = last.unwrap_or(0) + context.reader.read_var_i64(false)?;
        context.graph_context_mut().insert(LAST_STAMP, stamp);
        Ok(Stamp(stamp))
    }

    fn knot_copy(&self, _context: &mut CopyContext) -> Result<Self, Error> {
        Ok(Stamp(self.0))
    }
}

#[test]
fn test_graph_context_lives_for_one_graph() {
    let knot = Knot::default();
    let stamps = vec![Stamp(1_700_000_000), Stamp(1_700_000_001), Stamp(1_700_000_003)];
    let bytes = knot.serialize(&stamps).unwrap();
    // header, length, one full stamp, then two one-byte deltas
    assert_eq!(bytes.len(), 1 + 1 + 5 + 2);
    assert_eq!(knot.serialize(&stamps).unwrap(), bytes);
    assert_eq!(knot.deserialize::<Vec<Stamp>>(&bytes).unwrap(), stamps);
    assert_eq!(knot.deserialize::<Vec<Stamp>>(&bytes).unwrap(), stamps);
}
