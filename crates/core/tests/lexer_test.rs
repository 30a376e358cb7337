//! Tests for the tokenizer.

use folio_core::parser::{Keyword, Lexer, Token};

/// Mixed object syntax with known byte offsets.
const TESTDATA: &[u8] = b"% comment\n/Name 123 -4.5 (lit) <6869> [ ] << >> obj R\n";

fn expected_tokens() -> Vec<(usize, Token)> {
    vec![
        (10, Token::Name("Name".to_string())),
        (16, Token::Int(123)),
        (20, Token::Real(-4.5)),
        (25, Token::String(b"lit".to_vec())),
        (31, Token::HexString(b"hi".to_vec())),
        (38, Token::Keyword(Keyword::ArrayStart)),
        (40, Token::Keyword(Keyword::ArrayEnd)),
        (42, Token::Keyword(Keyword::DictStart)),
        (45, Token::Keyword(Keyword::DictEnd)),
        (48, Token::Keyword(Keyword::Obj)),
        (52, Token::Keyword(Keyword::R)),
    ]
}

#[test]
fn tokenization_with_positions() {
    let mut lexer = Lexer::new(TESTDATA);
    let mut tokens: Vec<(usize, Token)> = Vec::new();
    while let Some(result) = lexer.next_token() {
        tokens.push(result.unwrap());
    }

    let expected = expected_tokens();
    assert_eq!(tokens.len(), expected.len());
    for (i, ((pos, token), (exp_pos, exp_token))) in
        tokens.iter().zip(expected.iter()).enumerate()
    {
        assert_eq!(pos, exp_pos, "token {} position", i);
        assert_eq!(token, exp_token, "token {} value", i);
    }
}

fn lex_one(data: &[u8]) -> Token {
    Lexer::new(data).next_token().unwrap().unwrap().1
}

// Every supported escape must reproduce the original byte sequence
// exactly after lexing.
#[test]
fn string_escape_round_trips() {
    let cases: &[(&[u8], &[u8])] = &[
        (b"(A\\(B\\)C)", b"A(B)C"),
        (b"(abc ( def ) ghi)", b"abc ( def ) ghi"),
        (b"(\\n\\r\\t\\b\\f)", b"\n\r\t\x08\x0c"),
        (b"(back\\\\slash)", b"back\\slash"),
        (b"(\\101\\102)", b"AB"),
        (b"(\\0053)", b"\x053"),
        (b"(\\400)", b"\x00"), // octal overflow wraps to one byte
        (b"(foo\\\nbaa)", b"foobaa"),
        (b"(foo\\\r\nbaa)", b"foobaa"),
        (b"(foo\nbaa)", b"foo\nbaa"),
        (b"(\\q)", b"q"), // unknown escape keeps the char
        (b"(this % is not a comment)", b"this % is not a comment"),
        (b"()", b""),
    ];
    for (input, expected) in cases {
        match lex_one(input) {
            Token::String(s) => assert_eq!(
                &s, expected,
                "input {:?}",
                String::from_utf8_lossy(input)
            ),
            other => panic!("expected string for {:?}, got {:?}", input, other),
        }
    }
}

#[test]
fn hex_strings() {
    assert_eq!(lex_one(b"<>"), Token::HexString(vec![]));
    assert_eq!(lex_one(b"<20>"), Token::HexString(vec![0x20]));
    assert_eq!(
        lex_one(b"<48 65 6c 6C 6f>"),
        Token::HexString(b"Hello".to_vec())
    );
    // Odd trailing digit is padded with a zero low nibble
    assert_eq!(lex_one(b"<414>"), Token::HexString(vec![0x41, 0x40]));
}

#[test]
fn hex_string_vs_dict_open_lookahead() {
    let mut lexer = Lexer::new(b"<<48>> <48>");
    assert_eq!(
        lexer.next_token().unwrap().unwrap().1,
        Token::Keyword(Keyword::DictStart)
    );
    assert_eq!(lexer.next_token().unwrap().unwrap().1, Token::Int(48));
    assert_eq!(
        lexer.next_token().unwrap().unwrap().1,
        Token::Keyword(Keyword::DictEnd)
    );
    assert_eq!(
        lexer.next_token().unwrap().unwrap().1,
        Token::HexString(vec![0x48])
    );
}

#[test]
fn names_decode_hex_escapes() {
    assert_eq!(lex_one(b"/Name"), Token::Name("Name".to_string()));
    assert_eq!(lex_one(b"/A#20B"), Token::Name("A B".to_string()));
    assert_eq!(lex_one(b"/Some_Name"), Token::Name("Some_Name".to_string()));
    // Invalid hex escape: the '#' is dropped, following chars kept
    assert_eq!(lex_one(b"/foo#xbar"), Token::Name("fooxbar".to_string()));
    // Empty name (bare slash)
    assert_eq!(lex_one(b"/ x"), Token::Name(String::new()));
}

#[test]
fn numbers() {
    assert_eq!(lex_one(b"0"), Token::Int(0));
    assert_eq!(lex_one(b"+17"), Token::Int(17));
    assert_eq!(lex_one(b"-98"), Token::Int(-98));
    assert_eq!(lex_one(b"34.5"), Token::Real(34.5));
    assert_eq!(lex_one(b"-3.62"), Token::Real(-3.62));
    assert_eq!(lex_one(b".5"), Token::Real(0.5));
    assert_eq!(lex_one(b"4."), Token::Real(4.0));
}

#[test]
fn booleans_and_null() {
    assert_eq!(lex_one(b"true"), Token::Bool(true));
    assert_eq!(lex_one(b"false"), Token::Bool(false));
    assert_eq!(lex_one(b"null"), Token::Keyword(Keyword::Null));
}

#[test]
fn comments_are_skipped_outside_strings() {
    let mut lexer = Lexer::new(b"% header comment\r\n1 % trailing\n2");
    assert_eq!(lexer.next_token().unwrap().unwrap().1, Token::Int(1));
    assert_eq!(lexer.next_token().unwrap().unwrap().1, Token::Int(2));
    assert!(lexer.next_token().is_none());
}

#[test]
fn unknown_keywords_preserve_bytes() {
    assert_eq!(
        lex_one(b"BT"),
        Token::Keyword(Keyword::Unknown(b"BT".to_vec()))
    );
    assert_eq!(
        lex_one(b"do*"),
        Token::Keyword(Keyword::Unknown(b"do*".to_vec()))
    );
}

#[test]
fn end_of_input_is_none() {
    let mut lexer = Lexer::new(b"   % only trivia\n");
    assert!(lexer.next_token().is_none());
    assert!(lexer.next_token().is_none());
}
