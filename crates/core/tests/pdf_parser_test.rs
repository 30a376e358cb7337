//! Tests for the object parser.

use folio_core::parser::ObjectParser;
use folio_core::{ObjRef, PdfObject};

fn parse(data: &[u8]) -> PdfObject {
    ObjectParser::new(data).parse_object().unwrap()
}

#[test]
fn parse_simple_dict() {
    let obj = parse(b"<< /Type /Page /Count 5 >>");
    let dict = obj.as_dict().unwrap();
    assert_eq!(dict.get("Type").unwrap().as_name().unwrap(), "Page");
    assert_eq!(dict.get("Count").unwrap().as_int().unwrap(), 5);
}

#[test]
fn parse_nested_dict() {
    let obj = parse(b"<< /Resources << /Font << /F1 1 0 R >> >> >>");
    let dict = obj.as_dict().unwrap();
    let resources = dict.get("Resources").unwrap().as_dict().unwrap();
    let font = resources.get("Font").unwrap().as_dict().unwrap();
    let f1 = font.get("F1").unwrap().as_objref().unwrap();
    assert_eq!(*f1, ObjRef::new(1, 0));
}

#[test]
fn parse_array() {
    let obj = parse(b"[ 1 2.5 /Name (string) <4142> true null ]");
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 7);
    assert_eq!(arr[0].as_int().unwrap(), 1);
    assert_eq!(arr[1].as_real().unwrap(), 2.5);
    assert_eq!(arr[2].as_name().unwrap(), "Name");
    assert_eq!(arr[3].as_string().unwrap(), b"string");
    assert_eq!(arr[4].as_string().unwrap(), b"AB");
    assert!(arr[5].as_bool().unwrap());
    assert!(arr[6].is_null());
}

#[test]
fn parse_nested_arrays() {
    let obj = parse(b"[[1 2] [3 [4]]]");
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0].as_array().unwrap().len(), 2);
    let inner = arr[1].as_array().unwrap();
    assert_eq!(inner[0].as_int().unwrap(), 3);
    assert_eq!(inner[1].as_array().unwrap()[0].as_int().unwrap(), 4);
}

// The central ambiguity of the grammar: two integers followed by `R`
// collapse into one reference; anything else stays separate values.
#[test]
fn indirect_reference_collapse() {
    let obj = parse(b"[7 0 R]");
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(*arr[0].as_objref().unwrap(), ObjRef::new(7, 0));
}

#[test]
fn indirect_reference_needs_both_ints() {
    let obj = parse(b"[7 0 8 0 R]");
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0].as_int().unwrap(), 7);
    assert_eq!(*arr[1].as_objref().unwrap(), ObjRef::new(8, 0));
}

#[test]
fn bare_integer_pair_stays_two_values() {
    let obj = parse(b"[7 0]");
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0].as_int().unwrap(), 7);
    assert_eq!(arr[1].as_int().unwrap(), 0);
}

#[test]
fn reference_as_dict_value() {
    let obj = parse(b"<< /Parent 3 0 R /Count 10 >>");
    let dict = obj.as_dict().unwrap();
    assert_eq!(
        *dict.get("Parent").unwrap().as_objref().unwrap(),
        ObjRef::new(3, 0)
    );
    assert_eq!(dict.get("Count").unwrap().as_int().unwrap(), 10);
}

#[test]
fn dict_redeclared_key_is_last_write_wins() {
    let obj = parse(b"<< /A 1 /B 2 /A 3 >>");
    let dict = obj.as_dict().unwrap();
    assert_eq!(dict.get("A").unwrap().as_int().unwrap(), 3);
    assert_eq!(dict.len(), 2);
}

#[test]
fn dict_preserves_insertion_order() {
    let obj = parse(b"<< /Z 1 /A 2 /M 3 >>");
    let dict = obj.as_dict().unwrap();
    let keys: Vec<&str> = dict.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, ["Z", "A", "M"]);
}

#[test]
fn dict_key_must_be_a_name() {
    let mut parser = ObjectParser::new(b"<< (notaname) 1 >>");
    assert!(parser.parse_object().is_err());
}

#[test]
fn keywords_as_values() {
    assert!(parse(b"null").is_null());
    assert!(parse(b"true").as_bool().unwrap());
    assert!(!parse(b"false").as_bool().unwrap());
}

#[test]
fn unexpected_keyword_is_an_error() {
    let mut parser = ObjectParser::new(b"endobj");
    assert!(parser.parse_object().is_err());
}

#[test]
fn truncated_input_is_an_error() {
    assert!(ObjectParser::new(b"").parse_object().is_err());
    assert!(ObjectParser::new(b"[1 2").parse_object().is_err());
    assert!(ObjectParser::new(b"<< /A 1").parse_object().is_err());
}

#[test]
fn sequential_objects_from_one_parser() {
    let mut parser = ObjectParser::new(b"1 0 /Name (str)");
    assert_eq!(parser.parse_object().unwrap().as_int().unwrap(), 1);
    assert_eq!(parser.parse_object().unwrap().as_int().unwrap(), 0);
    assert_eq!(parser.parse_object().unwrap().as_name().unwrap(), "Name");
    assert_eq!(parser.parse_object().unwrap().as_string().unwrap(), b"str");
}
