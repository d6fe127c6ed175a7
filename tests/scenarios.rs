//! End-to-end Tokenizer+Parser+Handler scenarios (spec.md §8), mirroring
//! `html5ever/tests/tokenizer.rs`'s style of driving the public API and
//! asserting the resulting event sequence.

use htmlsax::parser::{Attribute, Handler, Parser, ParserInfo, ParserOptions};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Init,
    OpenTagName(String),
    OpenTag(String, Vec<(String, String)>),
    Attribute(String, String),
    CloseTag(String),
    Text(String),
    Error(String),
    End,
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl Handler for Recorder {
    fn onparserinit(&mut self, _info: ParserInfo) {
        self.events.push(Event::Init);
    }
    fn onopentagname(&mut self, name: &str) {
        self.events.push(Event::OpenTagName(name.to_string()));
    }
    fn onopentag(&mut self, name: &str, attribs: &[Attribute]) {
        let attrs = attribs.iter().map(|a| (a.name.clone(), a.value.clone())).collect();
        self.events.push(Event::OpenTag(name.to_string(), attrs));
    }
    fn onattribute(&mut self, name: &str, value: &str, _quote: Option<char>) {
        self.events.push(Event::Attribute(name.to_string(), value.to_string()));
    }
    fn onclosetag(&mut self, name: &str) {
        self.events.push(Event::CloseTag(name.to_string()));
    }
    fn ontext(&mut self, text: &str) {
        self.events.push(Event::Text(text.to_string()));
    }
    fn onerror(&mut self, err: &htmlsax::Error) {
        self.events.push(Event::Error(err.to_string()));
    }
    fn onend(&mut self) {
        self.events.push(Event::End);
    }
}

fn concatenated_text(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn scenario_1_self_closing_script() {
    let mut opts = ParserOptions::default();
    opts.recognize_self_closing = true;
    let mut parser = Parser::new(Recorder::default(), opts);
    parser.write("<script /><div></div>");
    parser.end(None);
    let events = parser.into_handler().events;
    assert_eq!(
        events,
        vec![
            Event::Init,
            Event::OpenTagName("script".into()),
            Event::OpenTag("script".into(), vec![]),
            Event::CloseTag("script".into()),
            Event::OpenTagName("div".into()),
            Event::OpenTag("div".into(), vec![]),
            Event::CloseTag("div".into()),
            Event::End,
        ]
    );
}

#[test]
fn scenario_2_raw_text_script_body() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("<script><div></div></script>");
    parser.end(None);
    let events = parser.into_handler().events;
    assert!(events.contains(&Event::OpenTag("script".into(), vec![])));
    assert!(events.contains(&Event::Text("<div></div>".into())));
    assert!(events.contains(&Event::CloseTag("script".into())));
}

#[test]
fn scenario_3_style_then_entity_then_void_br() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("<style>a{}</style>&apos;<br/>");
    parser.end(None);
    let events = parser.into_handler().events;
    assert!(events.contains(&Event::Text("a{}".into())));
    assert!(events.contains(&Event::CloseTag("style".into())));
    assert!(events.contains(&Event::Text("'".into())));
    assert!(events.contains(&Event::OpenTag("br".into(), vec![])));
    assert!(events.contains(&Event::CloseTag("br".into())));
}

#[test]
fn scenario_4_numeric_back_out() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("id=770&#anchor");
    parser.end(None);
    let events = parser.into_handler().events;
    assert_eq!(concatenated_text(&events), "id=770&#anchor");
}

#[test]
fn scenario_5_ambiguous_ampersand_in_attribute() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write(r#"<img src="?&image_uri=1&&image;=2&image=3"/>"#);
    parser.end(None);
    let events = parser.into_handler().events;
    let src = events.iter().find_map(|e| match e {
        Event::Attribute(name, value) if name == "src" => Some(value.clone()),
        _ => None,
    });
    assert_eq!(src.as_deref(), Some("?&image_uri=1&&image;=2&image=3"));
}

#[test]
fn scenario_6_legacy_named_entity_without_semicolon() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("&timesbar;&timesbar");
    parser.end(None);
    let events = parser.into_handler().events;
    assert_eq!(concatenated_text(&events), "\u{2A31}\u{2A31}");
}

#[test]
fn scenario_7_strict_mode_reports_line_2() {
    let mut opts = ParserOptions::default();
    opts.strict_mode = true;
    let mut parser = Parser::new(Recorder::default(), opts);
    parser.write("<html>\n<b&ody>");
    parser.end(None);
    let events = parser.into_handler().events;
    assert!(events.iter().any(|e| matches!(e,
        Event::Error(msg) if msg == "Element name cannot include '&'. Line 2")));
}

#[test]
fn scenario_8_entity_split_across_write_with_pause() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("&am");
    parser.pause();
    parser.write("p; it up!");
    parser.resume();
    parser.resume();
    parser.end(None);
    let events = parser.into_handler().events;
    assert_eq!(concatenated_text(&events), "& it up!");
}

#[test]
fn write_then_write_matches_single_write() {
    let mut split = Parser::new(Recorder::default(), ParserOptions::default());
    split.write("<p>hello");
    split.write(" world</p>");
    split.end(None);
    let split_events = split.into_handler().events;

    let mut whole = Parser::new(Recorder::default(), ParserOptions::default());
    whole.write("<p>hello world</p>");
    whole.end(None);
    let whole_events = whole.into_handler().events;

    assert_eq!(split_events, whole_events);
}

#[test]
fn reset_reproduces_identical_events() {
    let mut parser = Parser::new(Recorder::default(), ParserOptions::default());
    parser.write("<p>hi</p>");
    parser.end(None);
    let first = std::mem::take(&mut parser.handler_mut().events);

    parser.reset();
    parser.write("<p>hi</p>");
    parser.end(None);
    let second = parser.handler_mut().events.clone();

    // Both runs fire Init once at construction/reset, then identical tags.
    assert_eq!(first[1..], second[1..]);
}
