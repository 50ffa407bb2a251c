//! End-to-end question answering over the embedded graph with a scripted
//! text generator.

mod common;

use common::{bus, flight, load, open_graph, person, qa_service, selection, stay, CountingStore, ScriptedGenerator};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use travel_graph::ingest::RecordSets;
use travel_graph::llm::{AnswerSource, TextGenerator};
use travel_graph::query::PatternId;
use travel_graph::store::GraphClient;
use travel_graph::types::ErrorKind;
use travel_graph::QaStage;

fn travel_sets() -> RecordSets {
    RecordSets::from_records(
        vec![
            person(1, "Ali Veli"),
            person(2, "Ayşe Kaya"),
            person(3, "Mehmet Demir"),
            person(4, "Zeynep Çelik"),
        ],
        vec![
            stay(1, "Grand Otel", "İstanbul", "2023-06-15"),
            stay(2, "Grand Otel", "İstanbul", "2023-06-16"),
            stay(3, "Sahil Otel", "İzmir", "2023-07-01"),
        ],
        vec![
            flight(1, "Ankara", "İstanbul", "2024-03-01"),
            flight(3, "Ankara", "Antalya", "2024-05-20"),
        ],
        vec![
            bus(2, "Bursa", "İstanbul", "2024-03-02"),
            bus(4, "İzmir", "Antalya", "2024-05-21"),
        ],
    )
}

#[tokio::test]
async fn test_turkish_shared_hotel_question() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    let generator = ScriptedGenerator::new(vec![selection("shared_hotel", "Ali Veli", "Ayşe Kaya")]);
    let qa = qa_service(&t.graph, generator.clone());

    let outcome = qa.answer_detailed("Ali Veli ve Ayşe Kaya nerede birlikte kaldı?").await;

    assert!(outcome.succeeded(), "{:?}", outcome.error);
    assert_eq!(
        outcome.stages,
        vec![QaStage::Received, QaStage::Translated, QaStage::Executed, QaStage::Rendered, QaStage::Done]
    );
    assert_eq!(outcome.translation.as_ref().unwrap().pattern(), PatternId::SharedHotel);
    assert_eq!(outcome.rows.len(), 1);

    let row = &outcome.rows[0];
    assert_eq!(row["hotel"], "Grand Otel");
    assert_eq!(row["cities"], serde_json::json!(["İstanbul"]));
    assert_eq!(row["stays1"][0]["check_in"], "2023-06-15");
    assert_eq!(row["stays2"][0]["check_in"], "2023-06-16");

    assert_eq!(outcome.source, Some(AnswerSource::Generated));
    assert!(outcome.answer.contains("Grand Otel"));
    assert!(outcome.answer.contains("2023-06-15"));
    assert!(outcome.answer.contains("2023-06-16"));
    assert_eq!(generator.translation_calls(), 1);
}

#[tokio::test]
async fn test_flight_and_bus_to_same_city_is_one_shared_destination() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    let generator = ScriptedGenerator::new(vec![selection("shared_destination", "Ali Veli", "Ayşe Kaya")]);
    let qa = qa_service(&t.graph, generator);

    let outcome = qa.answer_detailed("Which cities did Ali Veli and Ayşe Kaya both travel to?").await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.rows.len(), 1);
    let row = &outcome.rows[0];
    assert_eq!(row["city"], "İstanbul");
    assert_eq!(row["trips1"][0]["relationship"], "FLEW");
    assert_eq!(row["trips2"][0]["relationship"], "TOOK_BUS");
    assert!(outcome.answer.contains("İstanbul"));
}

#[tokio::test]
async fn test_every_shared_destination_pair_names_the_city() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    for (a, b, city) in [("Ali Veli", "Ayşe Kaya", "İstanbul"), ("Mehmet Demir", "Zeynep Çelik", "Antalya")] {
        let generator = ScriptedGenerator::new(vec![selection("shared-destination", a, b)]);
        let qa = qa_service(&t.graph, generator);

        let outcome = qa.answer_detailed(&format!("Where did {} and {} both go?", a, b)).await;

        assert_eq!(outcome.rows.len(), 1, "{} / {}", a, b);
        assert_eq!(outcome.rows[0]["city"], city);
        assert!(outcome.answer.contains(city));
    }
}

#[tokio::test]
async fn test_no_relationship_gives_explicit_answer() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    let generator = ScriptedGenerator::new(vec![selection("shared_hotel", "Mehmet Demir", "Zeynep Çelik")]);
    let qa = qa_service(&t.graph, generator.clone());

    let outcome = qa.answer_detailed("Did Mehmet Demir and Zeynep Çelik stay at the same hotel?").await;

    assert!(outcome.succeeded());
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.source, Some(AnswerSource::NoResults));
    assert!(outcome
        .answer
        .starts_with("No relationship found between \"Mehmet Demir\" and \"Zeynep Çelik\""));
    // no synthesis call for an empty result
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unconnected_people_have_no_relationship_path() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    let generator = ScriptedGenerator::new(vec![selection("relationship_path", "Ali Veli", "Zeynep Çelik")]);
    let qa = qa_service(&t.graph, generator.clone());

    let outcome = qa.answer_detailed("What is the relationship between Ali Veli and Zeynep Çelik?").await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.translation.as_ref().unwrap().pattern(), PatternId::RelationshipPath);
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.source, Some(AnswerSource::NoResults));
    assert!(!outcome.answer.trim().is_empty());
    assert!(outcome
        .answer
        .starts_with("No relationship found between \"Ali Veli\" and \"Zeynep Çelik\""));
    assert!(outcome.answer.contains("relationship_path"));
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_pattern_never_reaches_the_store() {
    let t = open_graph();
    load(&t.graph, &travel_sets(), true).await;

    let counting = Arc::new(CountingStore {
        inner: t.graph.store(),
        pattern_calls: AtomicUsize::new(0),
    });
    let graph = GraphClient::new(counting.clone(), Duration::from_secs(5));
    let generator = ScriptedGenerator::new(vec![
        selection("shortest_path", "Ali Veli", "Ayşe Kaya"),
        r#"{"cypher": "MATCH (n) DETACH DELETE n"}"#.to_string(),
    ]);
    let generator_dyn: Arc<dyn TextGenerator> = generator.clone();
    let qa = qa_service(&graph, generator_dyn);

    let outcome = qa.answer_detailed("How are Ali Veli and Ayşe Kaya connected?").await;

    assert!(!outcome.succeeded());
    assert_eq!(outcome.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Translation));
    assert!(outcome.answer.contains("supported searches"));
    assert_eq!(counting.calls(), 0);
    assert_eq!(generator.translation_calls(), 2);

    // graph untouched
    assert_eq!(t.graph.counts().await.unwrap().nodes, 4 + 2 + 5 + 1 + 1);
}
