//! Replaying recorded NDJSON streams from files.

use std::{
    fs::{self, File},
    io::{BufReader, Write as _},
};

use cucumber_lifecycle::{Config, Hooks, Runtime, read_ndjson, writer};
use futures::stream;
use serde_json::{Value, json};

const RECORDED: &str = r#"{"meta":{"protocolVersion":"24.0.0","implementation":{"name":"cucumber-js"}}}
{"source":{"uri":"features/cart.feature","data":"Feature: Cart","mediaType":"text/x.cucumber.gherkin+plain"}}
{"gherkinDocument":{"uri":"features/cart.feature","feature":{"location":{"line":1,"column":1},"tags":[],"keyword":"Feature","name":"Cart","children":[{"rule":{"id":"r","location":{"line":3,"column":3},"keyword":"Rule","name":"Totals","children":[{"scenario":{"id":"sc","location":{"line":4,"column":5},"keyword":"Scenario","name":"Empty cart","steps":[{"id":"st-1","location":{"line":5,"column":7},"keyword":"Given ","text":"an empty cart"},{"id":"st-2","location":{"line":6,"column":7},"keyword":"Then ","text":"the total is 0"}]}}]}}]}}}
{"pickle":{"id":"p","uri":"features/cart.feature","name":"Empty cart","language":"en","astNodeIds":["sc"],"tags":[],"steps":[{"id":"ps-1","text":"an empty cart","type":"Context","astNodeIds":["st-1"]},{"id":"ps-2","text":"the total is 0","type":"Outcome","astNodeIds":["st-2"]}]}}
{"stepDefinition":{"id":"sd","pattern":{"source":"an empty cart","type":"CUCUMBER_EXPRESSION"},"sourceReference":{"uri":"steps.js"}}}
{"testRunStarted":{"timestamp":{"seconds":1700000000,"nanos":0}}}
{"testCase":{"id":"tc","pickleId":"p","testSteps":[{"id":"ts-1","pickleStepId":"ps-1"},{"id":"ts-2","pickleStepId":"ps-2"}]}}
{"testCaseStarted":{"id":"tcs","testCaseId":"tc","attempt":0,"timestamp":{"seconds":1700000001,"nanos":0}}}
{"testStepStarted":{"testCaseStartedId":"tcs","testStepId":"ts-1","timestamp":{"seconds":1700000001,"nanos":0}}}
{"testStepFinished":{"testCaseStartedId":"tcs","testStepId":"ts-1","testStepResult":{"status":"PASSED","duration":{"seconds":0,"nanos":1000000}},"timestamp":{"seconds":1700000001,"nanos":500000000}}}
{"testStepStarted":{"testCaseStartedId":"tcs","testStepId":"ts-2","timestamp":{"seconds":1700000001,"nanos":500000000}}}
{"testStepFinished":{"testCaseStartedId":"tcs","testStepId":"ts-2","testStepResult":{"status":"UNDEFINED","duration":{"seconds":0,"nanos":0}},"timestamp":{"seconds":1700000002,"nanos":0}}}
{"attachment":{"body":"c2NyZWVu","contentEncoding":"BASE64","mediaType":"image/png"}}
{"testCaseFinished":{"testCaseStartedId":"tcs","willBeRetried":false,"timestamp":{"seconds":1700000002,"nanos":0}}}
{"testRunFinished":{"success":false,"timestamp":{"seconds":1700000003,"nanos":0}}}
"#;

#[tokio::test]
async fn replays_recorded_file_into_ndjson() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("messages.ndjson");
    let output = dir.path().join("report.ndjson");
    File::create(&input).unwrap().write_all(RECORDED.as_bytes()).unwrap();

    let envelopes = read_ndjson(BufReader::new(File::open(&input).unwrap()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let config = Config { ignore_undefined_definitions: true, ..Config::default() };
    let (summary, out) = Runtime::new(
        config,
        Hooks::new(),
        writer::Json::new(File::create(&output).unwrap()),
    )
    .run(stream::iter(envelopes))
    .await;
    assert_eq!(out.written(), 8);
    drop(out.into_inner().unwrap());

    let lines = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap())
        .collect::<Vec<_>>();
    let events = lines.iter().map(|l| l["event"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(
        events,
        [
            "suite:start",
            "suite:start",
            "test:start",
            "test:pass",
            "test:start",
            "test:pending",
            "suite:end",
            "suite:end",
        ],
    );
    assert_eq!(
        lines[5]["payload"],
        json!({
            "uid": "ps-2",
            "title": "Then the total is 0 (undefined step)",
            "parent": "p",
            "type": "step",
            "file": "features/cart.feature",
            "tags": [],
            "duration": 0,
            "state": "pending",
            "fullTitle": "Cart: Empty cart: Then the total is 0 (undefined step)",
        }),
    );
    assert_eq!(lines[6]["payload"]["duration"], 1000);
    assert!(summary.success);
}

#[tokio::test]
async fn engine_verdict_is_kept_when_undefined_steps_fail() {
    let envelopes = read_ndjson(RECORDED.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let (summary, msgs) = Runtime::new(Config::default(), Hooks::new(), Vec::new())
        .run(stream::iter(envelopes))
        .await;

    assert_eq!(summary.failures, 1);
    assert!(!summary.success);
    let fail = msgs.iter().find(|m| m.name() == "test:fail").unwrap();
    let err = fail.payload().error.as_ref().unwrap();
    assert!(err.stack.ends_with(
        "\tat Feature(features/cart.feature):1:1\n\
         \tat Scenario(Empty cart):4:5\n\
         \tat Step(the total is 0):6:7\n",
    ));
}
