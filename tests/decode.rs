#![cfg(feature = "serde")]

use std::collections::BTreeMap;

use detoml::{decode, from_slice, from_str, Datetime, Error, Offset, Primitive, Value};
use serde::Deserialize;

#[test]
fn simple_document() {
    #[derive(Deserialize, Debug)]
    struct Simple {
        age: i64,
        andrew: String,
        pi: f64,
        #[serde(rename = "yesOrNo")]
        yes_or_no: bool,
        my: BTreeMap<String, Cats>,
    }

    #[derive(Deserialize, Debug)]
    struct Cats {
        plato: String,
        cauchy: String,
    }

    let simple: Simple = from_str(
        "age = 250\nandrew = \"gallant\"\npi = 3.14\nyesOrNo = true\n\
         [My.Cats]\nplato = \"cat 1\"\ncauchy = \"cat 2\"\n",
    )
    .unwrap();
    assert_eq!(simple.age, 250);
    assert_eq!(simple.andrew, "gallant");
    assert_eq!(simple.pi, 3.14);
    assert!(simple.yes_or_no);
    let cats = &simple.my["Cats"];
    assert_eq!(cats.plato, "cat 1");
    assert_eq!(cats.cauchy, "cat 2");
}

#[test]
fn exact_case_beats_case_insensitive() {
    #[derive(Deserialize, Debug)]
    struct Fields {
        #[serde(rename = "Match")]
        first: String,
        #[serde(rename = "MatcH")]
        second: String,
    }

    let fields: Fields = from_str("Match = \"a\"\nMatcH = \"b\"\n").unwrap();
    assert_eq!(fields.first, "a");
    assert_eq!(fields.second, "b");
}

#[test]
fn case_insensitive_fallback() {
    #[derive(Deserialize, Debug)]
    struct Config {
        servers: Vec<String>,
        timeout: i64,
    }

    let config: Config = from_str("SERVERS = [\"a\", \"b\"]\nTimeout = 5\n").unwrap();
    assert_eq!(config.servers, ["a", "b"]);
    assert_eq!(config.timeout, 5);
}

#[test]
fn unknown_and_skipped_keys_decode_into_nothing() {
    #[derive(Deserialize, Debug)]
    struct Narrow {
        kept: i64,
        #[serde(skip)]
        hidden: i64,
    }

    let narrow: Narrow = from_str("kept = 1\nextra = \"ignored\"\nhidden = 9\n").unwrap();
    assert_eq!(narrow.kept, 1);
    assert_eq!(narrow.hidden, 0);
}

#[test]
fn optional_fields() {
    #[derive(Deserialize, Debug)]
    struct Opt {
        present: Option<i64>,
        absent: Option<String>,
    }

    let opt: Opt = from_str("present = 7\n").unwrap();
    assert_eq!(opt.present, Some(7));
    assert_eq!(opt.absent, None);
}

#[test]
fn borrowed_strings() {
    #[derive(Deserialize, Debug)]
    struct Borrowed<'a> {
        name: &'a str,
    }

    let doc = String::from("name = \"zed\"\n");
    let borrowed: Borrowed<'_> = from_str(&doc).unwrap();
    assert_eq!(borrowed.name, "zed");
}

#[test]
fn integer_widths_are_checked() {
    #[derive(Deserialize, Debug)]
    struct Widths {
        byte: u8,
        short: i16,
        wide: i64,
    }

    let widths: Widths = from_str("byte = 255\nshort = -300\nwide = 9_223_372_036_854_775_807\n")
        .unwrap();
    assert_eq!(widths.byte, 255);
    assert_eq!(widths.short, -300);
    assert_eq!(widths.wide, i64::MAX);

    #[derive(Deserialize, Debug)]
    struct Byte {
        value: u8,
    }

    let err = from_str::<Byte>("value = 300\n").unwrap_err();
    match err {
        Error::Bind(b) => {
            assert!(b.message().contains("out of range"));
            assert_eq!(b.key(), "value");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(from_str::<Byte>("value = -1\n").is_err());

    #[derive(Deserialize, Debug)]
    struct Min {
        value: i64,
    }
    let min: Min = from_str("value = -9_223_372_036_854_775_808\n").unwrap();
    assert_eq!(min.value, i64::MIN);
}

#[test]
fn integers_do_not_promote_to_floats() {
    #[derive(Deserialize, Debug)]
    struct F {
        x: f64,
    }

    let err = from_str::<F>("x = 3\n").unwrap_err();
    assert!(err.to_string().contains("cannot decode TOML integer"));
    let f: F = from_str("x = 3.0\n").unwrap();
    assert_eq!(f.x, 3.0);
}

#[test]
fn f32_range_is_checked() {
    #[derive(Deserialize, Debug)]
    struct F {
        x: f32,
    }

    let f: F = from_str("x = 0.5\n").unwrap();
    assert_eq!(f.x, 0.5);
    let err = from_str::<F>("x = 1e300\n").unwrap_err();
    assert!(err.to_string().contains("out of range"));
    // infinities pass through
    let f: F = from_str("x = -inf\n").unwrap();
    assert_eq!(f.x, f32::NEG_INFINITY);
}

#[test]
fn char_destinations() {
    #[derive(Deserialize, Debug)]
    struct C {
        c: char,
    }

    let c: C = from_str("c = \"x\"\n").unwrap();
    assert_eq!(c.c, 'x');
    assert!(from_str::<C>("c = \"xy\"\n").is_err());
}

#[test]
fn sequences_and_fixed_length_arrays() {
    #[derive(Deserialize, Debug)]
    struct Seqs {
        names: Vec<String>,
        point: [i64; 3],
        pair: (i64, String),
    }

    let seqs: Seqs = from_str(
        "names = [\"a\", \"b\"]\npoint = [1, 2, 3]\npair = [10, \"ten\"]\n",
    )
    .unwrap();
    assert_eq!(seqs.names, ["a", "b"]);
    assert_eq!(seqs.point, [1, 2, 3]);
    assert_eq!(seqs.pair, (10, String::from("ten")));

    #[derive(Deserialize, Debug)]
    struct Fixed {
        point: [i64; 3],
    }
    let err = from_str::<Fixed>("point = [1, 2]\n").unwrap_err();
    assert!(err.to_string().contains("length"));
}

#[test]
fn array_of_tables_into_structs() {
    #[derive(Deserialize, Debug)]
    struct Library {
        albums: Vec<Album>,
    }

    #[derive(Deserialize, Debug)]
    struct Album {
        name: String,
    }

    let (library, meta) =
        decode::<Library>("[[albums]]\nname = \"x\"\n[[albums]]\nname = \"y\"\n").unwrap();
    assert_eq!(library.albums.len(), 2);
    assert_eq!(library.albums[0].name, "x");
    assert_eq!(library.albums[1].name, "y");
    assert_eq!(meta.type_of(&["albums"]), Some("ArrayHash"));
}

#[test]
fn enums() {
    #[derive(Deserialize, Debug, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    enum Shape {
        Point(i64),
        Circle { radius: f64 },
    }

    #[derive(Deserialize, Debug)]
    struct Doc {
        color: Color,
        point: Shape,
        circle: Shape,
    }

    let doc: Doc = from_str(
        "color = \"Green\"\npoint = { Point = 3 }\ncircle = { Circle = { radius = 1.5 } }\n",
    )
    .unwrap();
    assert_eq!(doc.color, Color::Green);
    assert_eq!(doc.point, Shape::Point(3));
    assert_eq!(doc.circle, Shape::Circle { radius: 1.5 });
}

#[test]
fn datetimes_bind_with_components_preserved() {
    #[derive(Deserialize, Debug)]
    struct Times {
        odt: Datetime,
        ldt: Datetime,
        ld: Datetime,
        lt: Datetime,
    }

    let times: Times = from_str(
        "odt = 1979-05-27T07:32:00.999-07:00\nldt = 1979-05-27T07:32:00\n\
         ld = 1979-05-27\nlt = 07:32:00\n",
    )
    .unwrap();
    assert_eq!(times.odt.offset, Some(Offset::Custom { minutes: -420 }));
    assert_eq!(times.odt.time.unwrap().nanosecond, 999_000_000);
    // local values carry no offset; no timezone is assumed
    assert_eq!(times.ldt.offset, None);
    assert!(times.ldt.time.is_some());
    assert_eq!(times.ld.time, None);
    assert_eq!(times.lt.date, None);
    assert_eq!(times.lt.time.unwrap().hour, 7);
}

#[test]
fn generic_value_destinations() {
    let value: Value<'_> = from_str("[t]\nx = 1\nd = 1979-05-27\narr = [1, \"two\"]\n").unwrap();
    let table = value.as_table().unwrap();
    assert_eq!(
        table.get_path(&["t", "x"]).and_then(Value::as_integer),
        Some(1)
    );
    // datetimes survive the generic tree round trip
    assert!(table.get_path(&["t", "d"]).unwrap().as_datetime().is_some());
    let arr = table.get_path(&["t", "arr"]).unwrap().as_array().unwrap();
    assert_eq!(arr.get(1).and_then(Value::as_str), Some("two"));
}

#[test]
fn maps_with_non_string_keys_are_rejected() {
    let err = from_str::<BTreeMap<i64, i64>>("1 = 2\n").unwrap_err();
    assert!(matches!(err, Error::Bind(_)));
}

#[test]
fn bind_errors_carry_the_key_path() {
    #[derive(Deserialize, Debug)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Deserialize, Debug)]
    struct Inner {
        count: u8,
    }

    let err = from_str::<Outer>("[inner]\ncount = 1000\n").unwrap_err();
    match err {
        Error::Bind(b) => assert_eq!(b.key(), "inner.count"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn metadata_keys_are_ordered_and_typed() {
    let (_, meta) = decode::<Value<'_>>(
        "b = 1\na = \"x\"\n[t]\nc = 2.5\npoint = { x = 1 }\n[[arr]]\nv = 1979-05-27\n",
    )
    .unwrap();

    let keys: Vec<String> = meta.keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        ["b", "a", "t", "t.c", "t.point", "t.point.x", "arr", "arr.v"]
    );

    // no duplicates, everything defined and typed
    for key in meta.keys() {
        let segments: Vec<&str> = key.segments().iter().map(|s| s.as_ref()).collect();
        assert!(meta.is_defined(&segments));
        assert!(meta.type_of(&segments).is_some());
        assert_eq!(meta.keys().iter().filter(|k| *k == key).count(), 1);
    }

    assert_eq!(meta.type_of(&["b"]), Some("Integer"));
    assert_eq!(meta.type_of(&["a"]), Some("String"));
    assert_eq!(meta.type_of(&["t"]), Some("Hash"));
    assert_eq!(meta.type_of(&["t", "c"]), Some("Float"));
    assert_eq!(meta.type_of(&["t", "point"]), Some("Hash"));
    assert_eq!(meta.type_of(&["arr"]), Some("ArrayHash"));
    assert_eq!(meta.type_of(&["arr", "v"]), Some("Datetime"));
    assert!(meta.type_of(&["missing"]).is_none());
    assert!(!meta.is_defined(&["missing"]));
    // intermediate tables of deeper keys count as defined
    assert!(meta.is_defined(&["t"]));
}

#[test]
fn primitives_defer_decoding() {
    #[derive(Deserialize, Debug)]
    struct Deferred {
        title: String,
        config: Primitive,
    }

    #[derive(Deserialize, Debug)]
    struct Config {
        port: u16,
        host: String,
    }

    let (deferred, mut meta) = decode::<Deferred>(
        "title = \"app\"\n[config]\nport = 8080\nhost = \"localhost\"\n",
    )
    .unwrap();
    assert_eq!(deferred.title, "app");
    assert!(deferred.config.value().as_table().is_some());

    let undecoded: Vec<String> = meta.undecoded().iter().map(|k| k.to_string()).collect();
    assert_eq!(undecoded, ["config", "config.port", "config.host"]);

    let config: Config = meta.primitive_decode(deferred.config).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.host, "localhost");
    assert!(meta.undecoded().is_empty());
}

#[test]
fn nested_primitives_stay_undecoded() {
    #[derive(Deserialize, Debug)]
    struct Outer {
        #[allow(dead_code)]
        name: String,
        payload: Primitive,
    }

    #[derive(Deserialize, Debug)]
    struct Payload {
        kind: String,
        rest: Primitive,
    }

    let (outer, mut meta) = decode::<Outer>(
        "name = \"n\"\n[payload]\nkind = \"k\"\n[payload.rest]\ndeep = 1\n",
    )
    .unwrap();
    assert!(!meta.undecoded().is_empty());

    let payload: Payload = meta.primitive_decode(outer.payload).unwrap();
    assert_eq!(payload.kind, "k");
    // the nested primitive is still pending
    let undecoded: Vec<String> = meta.undecoded().iter().map(|k| k.to_string()).collect();
    assert_eq!(undecoded, ["payload.rest", "payload.rest.deep"]);

    #[derive(Deserialize, Debug)]
    struct Rest {
        deep: i64,
    }
    let rest: Rest = meta.primitive_decode(payload.rest).unwrap();
    assert_eq!(rest.deep, 1);
    assert!(meta.undecoded().is_empty());
}

#[test]
fn embedded_records_flatten_into_the_parent() {
    #[derive(Deserialize, Debug)]
    struct Outer {
        id: i64,
        #[serde(flatten)]
        net: Net,
    }

    #[derive(Deserialize, Debug)]
    struct Net {
        host: String,
        port: u16,
    }

    let outer: Outer = from_str("id = 1\nhost = \"h\"\nport = 80\n").unwrap();
    assert_eq!(outer.id, 1);
    assert_eq!(outer.net.host, "h");
    assert_eq!(outer.net.port, 80);
}

#[test]
fn crlf_and_lf_decode_identically() {
    #[derive(Deserialize, Debug, PartialEq)]
    struct Doc {
        x: String,
        y: i64,
    }

    let lf: Doc = from_str("x = \"v\"\ny = 1\n").unwrap();
    let crlf: Doc = from_str("x = \"v\"\r\ny = 1\r\n").unwrap();
    assert_eq!(lf, crlf);
}

#[test]
fn from_slice_applies_the_preflight_checks() {
    #[derive(Deserialize, Debug)]
    struct Doc {
        a: i64,
    }

    let doc: Doc = from_slice(b"\xEF\xBB\xBFa = 1\n").unwrap();
    assert_eq!(doc.a, 1);

    let bytes = [
        0x61, 0x00, 0x20, 0x00, 0x3D, 0x00, 0x20, 0x00, 0x22, 0x00, 0x62, 0x00, 0x22, 0x00,
    ];
    let err = from_slice::<Doc>(&bytes).unwrap_err();
    assert!(err.to_string().contains("files cannot contain NULL bytes"));
}

#[test]
fn root_must_bind_to_a_table_shape() {
    let err = from_str::<i64>("a = 1\n").unwrap_err();
    assert!(err.to_string().contains("cannot decode TOML table"));
}
