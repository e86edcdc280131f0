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
use knot_core::Knot;
use knot_derive::KnotObject;

#[derive(KnotObject, Debug, PartialEq)]
struct Person {
    name: String,
    tags: Vec<String>,
}

#[derive(KnotObject)]
struct Chain {
    value: u16,
    next: Option<Box<Chain>>,
}

fn chain(len: u16) -> Chain {
    let mut head = Chain {
        value: 0,
        next: None,
    };
    for value in 1..len {
        head = Chain {
            value,
            next: Some(Box::new(head)),
        };
    }
    head
}

#[test]
fn test_truncated_input_trace() {
    let knot = Knot::default();
    let person = Person {
        name: "ann".to_string(),
        tags: vec!["a".to_string(), "bc".to_string()],
    };
    let bytes = knot.serialize(&person).unwrap();
    let err = knot
        .deserialize::<Person>(&bytes[..bytes.len() - 1])
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::BufferUnderflow { .. }));
    assert_eq!(err.trace(), ["[1]", "tags (Person)"]);
    let message = err.to_string();
    assert!(message.contains("Serialization trace"));
    assert!(message.contains("tags (Person)"));
}

#[test]
fn test_unsupported_wire_version() {
    let knot = Knot::default();
    let mut bytes = knot.serialize(&1i32).unwrap();
    bytes[0] = 0x21;
    assert!(matches!(
        knot.deserialize::<i32>(&bytes),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn test_float_mode_mismatch() {
    let writer = Knot::new().float_precision(Some(1000.0));
    let bytes = writer.serialize(&1.5f64).unwrap();
    assert!(bytes.len() < 9);
    assert_eq!(writer.deserialize::<f64>(&bytes).unwrap(), 1.5);
    assert!(matches!(
        Knot::default().deserialize::<f64>(&bytes),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn test_float_precision_mismatch() {
    let writer = Knot::new().float_precision(Some(10.0));
    let bytes = writer.serialize(&vec![0.5f64, 2.25]).unwrap();
    assert!(matches!(
        Knot::new()
            .float_precision(Some(100.0))
            .deserialize::<Vec<f64>>(&bytes),
        Err(Error::InvalidData(_))
    ));

    let reader = Knot::new().float_precision(Some(10.0));
    assert_eq!(reader.deserialize::<Vec<f64>>(&bytes).unwrap(), [0.5, 2.25]);

    let fractional = Knot::new().float_precision(Some(0.5));
    let bytes = fractional.serialize(&4.0f64).unwrap();
    assert_eq!(fractional.deserialize::<f64>(&bytes).unwrap(), 4.0);
}

#[test]
fn test_max_depth() {
    let knot = Knot::new().max_depth(16);
    assert!(knot.serialize(&chain(3)).is_ok());
    let err = knot.serialize(&chain(50)).unwrap_err();
    assert!(matches!(err.root_cause(), Error::DepthExceed(_)));
    assert!(err.trace().iter().any(|segment| segment == "next (Chain)"));

    let bytes = Knot::default().serialize(&chain(50)).unwrap();
    assert!(matches!(
        knot.deserialize::<Chain>(&bytes).map(|_| ()).unwrap_err().root_cause(),
        Error::DepthExceed(_)
    ));
    assert!(matches!(
        knot.copy(&chain(50)).map(|_| ()).unwrap_err().root_cause(),
        Error::DepthExceed(_)
    ));
}

#[test]
fn test_bounded_output() {
    let knot = Knot::new().buffer_size(8, Some(8));
    assert!(knot.serialize(&"short".to_string()).is_ok());
    let err = knot.serialize(&"a string that does not fit".to_string()).unwrap_err();
    assert!(matches!(err.root_cause(), Error::BufferOverflow { .. }));
}

#[test]
fn test_bad_null_flag() {
    let knot = Knot::default();
    assert!(matches!(
        knot.deserialize::<Option<i32>>(&[0x11, 7, 2]),
        Err(Error::InvalidData(_))
    ));
}
