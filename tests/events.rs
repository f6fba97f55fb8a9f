// tests/events.rs

use serde_json::json;

use taskgraph::events::{EventSink, JsonSink, TaskEvent};

#[test]
fn json_sink_writes_one_object_per_line() {
    let sink = JsonSink::new(Vec::new());
    sink.emit(&TaskEvent::RunStarted {
        run: "r".into(),
        total: 2,
    });
    sink.emit(&TaskEvent::TaskRetrying {
        task: "t".into(),
        attempt: 1,
        max_retries: 3,
        delay_ms: 250,
    });

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(
        lines,
        vec![
            json!({ "event": "run_started", "run": "r", "total": 2 }),
            json!({
                "event": "task_retrying",
                "task": "t",
                "attempt": 1,
                "max_retries": 3,
                "delay_ms": 250
            }),
        ]
    );
}

#[test]
fn events_round_trip_and_name_their_task() {
    let event = TaskEvent::TaskFailed {
        task: "t".into(),
        attempts: 2,
        error: "bad".into(),
    };
    let text = serde_json::to_string(&event).unwrap();
    let back: TaskEvent = serde_json::from_str(&text).unwrap();

    assert_eq!(back, event);
    assert_eq!(back.task(), Some("t"));
    assert_eq!(
        TaskEvent::RunProgress {
            run: "r".into(),
            completed: 1,
            total: 2
        }
        .task(),
        None
    );
}
