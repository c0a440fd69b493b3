mod common;

use axum::http::{Method, StatusCode};
use common::{FixedLiterature, TestApp};
use drug_discovery_core::domain::RelatedWork;
use serde_json::json;

const COST_REPORT: &str = "1. Cost Overview:\n- R&D: $2.6B\n- Timeline: 10-15 years\n2. Key Factors:\n- Trial phases";

//=========================================================================================
// Plain-Text Reports
//=========================================================================================

#[tokio::test]
async fn blank_smiles_is_rejected_before_any_generative_call() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;

    for uri in ["/cost-estimations", "/toxicity", "/variants/info", "/molecules/report"] {
        let (status, _, _) = app
            .send(Method::POST, uri, Some(&cookie), Some(json!({ "smiles": "   " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
    assert_eq!(app.generator.calls().await, 0);
}

#[tokio::test]
async fn cost_estimation_is_parsed_stored_and_listed() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator.reply(COST_REPORT).await;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/cost-estimations",
            Some(&cookie),
            Some(json!({ "smiles": "CC(=O)OC1=CC=CC=C1C(=O)O", "title": "Aspirin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Aspirin");
    assert_eq!(body["raw_output"], COST_REPORT);
    assert_eq!(
        body["details"],
        json!([
            { "title": "1. Cost Overview:", "bulletPoints": ["R&D: $2.6B", "Timeline: 10-15 years"] },
            { "title": "2. Key Factors:", "bulletPoints": ["Trial phases"] },
        ])
    );

    let prompt = app.generator.last_prompt().await.unwrap();
    assert!(prompt.contains("CC(=O)OC1=CC=CC=C1C(=O)O"));

    let (status, history, _) = app
        .send(Method::GET, "/cost-estimations", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["details"][0]["bulletPoints"][1], "Timeline: 10-15 years");
}

#[tokio::test]
async fn histories_are_scoped_to_the_owner() {
    let app = TestApp::new();
    let ada = app.signup("ada@example.com").await;
    let bob = app.signup("bob@example.com").await;
    app.generator.reply("1. Toxicity:\n- Low").await;

    let (status, _, _) = app
        .send(Method::POST, "/toxicity", Some(&ada), Some(json!({ "smiles": "CCO" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, theirs, _) = app.send(Method::GET, "/toxicity", Some(&bob), None).await;
    assert_eq!(theirs, json!([]));
    let (_, mine, _) = app.send(Method::GET, "/toxicity", Some(&ada), None).await;
    assert_eq!(mine[0]["title"], "CCO");
}

#[tokio::test]
async fn unstructured_report_falls_back_to_the_no_details_message() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator.reply("I cannot help with that molecule.").await;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/molecules/report",
            Some(&cookie),
            Some(json!({ "smiles": "CCO" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"], "No detailed information available");
}

#[tokio::test]
async fn generative_failure_surfaces_as_bad_gateway() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator.fail("quota exceeded").await;

    let (status, _, _) = app
        .send(Method::POST, "/toxicity", Some(&cookie), Some(json!({ "smiles": "CCO" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, history, _) = app.send(Method::GET, "/toxicity", Some(&cookie), None).await;
    assert_eq!(history, json!([]));
}

//=========================================================================================
// Variant Info Retry
//=========================================================================================

#[tokio::test]
async fn variant_info_gives_up_after_three_retries() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    for _ in 0..5 {
        app.generator.fail("upstream unavailable").await;
    }

    let (status, body, _) = app
        .send(Method::POST, "/variants/info", Some(&cookie), Some(json!({ "smiles": "CCO" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "Failed to fetch variant information after multiple attempts");
    assert_eq!(app.generator.calls().await, 4);
}

#[tokio::test]
async fn variant_info_recovers_on_a_later_attempt() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator.fail("timeout").await;
    app.generator.fail("timeout").await;
    app.generator.reply("1. Variants:\n- Ethanol-d6").await;

    let (status, body, _) = app
        .send(Method::POST, "/variants/info", Some(&cookie), Some(json!({ "smiles": "CCO" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"][0]["bulletPoints"][0], "Ethanol-d6");
    assert_eq!(app.generator.calls().await, 3);
}

//=========================================================================================
// JSON-Mode Responses
//=========================================================================================

#[tokio::test]
async fn molecule_creation_extracts_json_and_rejects_duplicates() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator
        .reply(
            "Here you go:\n```json\n{\"iupacName\": \"ethanol\", \"conversionDetails\": \"C2H6O\", \"potentialDiseases\": \"none\"}\n```",
        )
        .await;

    let request = json!({ "title": "Ethanol", "smiles": "CCO" });
    let (status, body, _) = app
        .send(Method::POST, "/molecules", Some(&cookie), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["iupac_name"], "ethanol");
    assert_eq!(body["accepted_name"], serde_json::Value::Null);

    let (status, _, _) = app
        .send(Method::POST, "/molecules", Some(&cookie), Some(request))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.generator.calls().await, 1);
    assert_eq!(app.db.molecules().await.len(), 1);
}

#[tokio::test]
async fn reply_without_json_is_not_persisted() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator.reply("Sorry, no structured data today.").await;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/molecules",
            Some(&cookie),
            Some(json!({ "title": "Ethanol", "smiles": "CCO" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "No valid JSON found");
    assert!(app.db.molecules().await.is_empty());
}

#[tokio::test]
async fn target_prediction_reads_json_embedded_in_prose() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator
        .reply(
            "Result: {\"targets\":[{\"protein\":\"COX-2\",\"confidence\":0.6},{\"protein\":\"COX-1\",\"confidence\":0.9}]} thanks",
        )
        .await;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/targets/predict",
            Some(&cookie),
            Some(json!({ "smiles": "CC(=O)OC1=CC=CC=C1C(=O)O" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["targets"][0]["protein"], "COX-1");
    assert_eq!(body["targets"][0]["confidence"], 0.9);
    assert_eq!(body["targets"][1]["protein"], "COX-2");
}

//=========================================================================================
// Drug Names
//=========================================================================================

#[tokio::test]
async fn accepting_a_name_renames_the_matching_molecule() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator
        .reply("{\"iupacName\": \"ethanol\", \"conversionDetails\": \"\", \"potentialDiseases\": \"\"}")
        .await;
    app.generator
        .reply("{\"names\": [\"Ethanix\", \" Alcovar \", \"Ethanix\"]}")
        .await;

    let molecule = json!({ "title": "Ethanol", "smiles": "CCO" });
    app.send(Method::POST, "/molecules", Some(&cookie), Some(molecule.clone()))
        .await;
    let (status, suggestion, _) = app
        .send(Method::POST, "/drug-names", Some(&cookie), Some(molecule))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(suggestion["status"], "pending");
    assert_eq!(suggestion["suggested_names"], json!(["Ethanix", "Alcovar"]));
    let id = suggestion["id"].as_str().unwrap().to_string();

    let (status, _, _) = app
        .send(
            Method::POST,
            &format!("/drug-names/{}/accept", id),
            Some(&cookie),
            Some(json!({ "name": "Invented" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, accepted, _) = app
        .send(
            Method::POST,
            &format!("/drug-names/{}/accept", id),
            Some(&cookie),
            Some(json!({ "name": "Alcovar" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["molecule_updated"], true);
    assert_eq!(accepted["suggestion"]["status"], "accepted");
    assert_eq!(
        app.db.molecules().await[0].accepted_name.as_deref(),
        Some("Alcovar")
    );

    let (status, _, _) = app
        .send(Method::DELETE, &format!("/drug-names/{}", id), Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_molecule_rename_leaves_the_suggestion_pending() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator
        .reply("{\"iupacName\": \"ethanol\", \"conversionDetails\": \"\", \"potentialDiseases\": \"\"}")
        .await;
    app.generator.reply("{\"names\": [\"Ethanix\"]}").await;

    let molecule = json!({ "title": "Ethanol", "smiles": "CCO" });
    app.send(Method::POST, "/molecules", Some(&cookie), Some(molecule.clone()))
        .await;
    let (_, suggestion, _) = app
        .send(Method::POST, "/drug-names", Some(&cookie), Some(molecule))
        .await;
    let uri = format!("/drug-names/{}/accept", suggestion["id"].as_str().unwrap());
    let body = json!({ "name": "Ethanix" });

    app.db.fail_molecule_writes(true);
    let (status, _, _) = app
        .send(Method::POST, &uri, Some(&cookie), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, history, _) = app.send(Method::GET, "/drug-names", Some(&cookie), None).await;
    assert_eq!(history[0]["status"], "pending");
    assert_eq!(history[0]["accepted_name"], serde_json::Value::Null);
    assert!(app.db.molecules().await[0].accepted_name.is_none());

    // Once the store recovers, the same request goes through.
    app.db.fail_molecule_writes(false);
    let (status, accepted, _) = app
        .send(Method::POST, &uri, Some(&cookie), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["molecule_updated"], true);
    assert_eq!(
        app.db.molecules().await[0].accepted_name.as_deref(),
        Some("Ethanix")
    );
}

#[tokio::test]
async fn pending_suggestions_can_be_deleted_only_by_their_owner() {
    let app = TestApp::new();
    let ada = app.signup("ada@example.com").await;
    let bob = app.signup("bob@example.com").await;
    app.generator.reply("{\"names\": [\"Ethanix\"]}").await;

    let (_, suggestion, _) = app
        .send(
            Method::POST,
            "/drug-names",
            Some(&ada),
            Some(json!({ "title": "Ethanol", "smiles": "CCO" })),
        )
        .await;
    let uri = format!("/drug-names/{}", suggestion["id"].as_str().unwrap());

    let (status, _, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.send(Method::DELETE, &uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, history, _) = app.send(Method::GET, "/drug-names", Some(&ada), None).await;
    assert_eq!(history, json!([]));
}

//=========================================================================================
// Research Papers & Saved Searches
//=========================================================================================

fn work(id: &str, title: &str) -> RelatedWork {
    RelatedWork {
        external_id: id.to_string(),
        title: title.to_string(),
        publication_year: Some(2021),
        doi: None,
        cited_by_count: 12,
        authors: vec!["A. Chemist".to_string()],
    }
}

#[tokio::test]
async fn related_papers_are_saved_once_per_title() {
    let app = TestApp::with_literature(FixedLiterature {
        works: vec![
            work("W1", "Aspirin and platelets"),
            work("W2", "Salicylates revisited"),
        ],
    });
    let cookie = app.signup("ada@example.com").await;
    let request = json!({ "query": "aspirin" });

    let (status, body, _) = app
        .send(Method::POST, "/research-papers/related", Some(&cookie), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["works"].as_array().unwrap().len(), 2);
    assert_eq!(body["newly_saved"], 2);

    let (_, body, _) = app
        .send(Method::POST, "/research-papers/related", Some(&cookie), Some(request))
        .await;
    assert_eq!(body["newly_saved"], 0);

    let (_, papers, _) = app
        .send(Method::GET, "/research-papers", Some(&cookie), None)
        .await;
    assert_eq!(papers.as_array().unwrap().len(), 2);
    assert!(papers.as_array().unwrap().iter().all(|p| p["kind"] == "related"));
}

#[tokio::test]
async fn generated_paper_is_stored_with_its_sections() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;
    app.generator
        .reply(
            "{\"title\": \"On Ethanol\", \"abstract\": \"Short.\", \"introduction\": \"\", \"methodology\": \"\", \"results\": \"\", \"conclusion\": \"\", \"references\": [\"Ref 1\"]}",
        )
        .await;

    let (status, paper, _) = app
        .send(
            Method::POST,
            "/research-papers/generate",
            Some(&cookie),
            Some(json!({ "title": "Ethanol", "smiles": "CCO" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paper["kind"], "generated");
    assert_eq!(paper["content"]["abstract"], "Short.");
    assert_eq!(paper["content"]["references"][0], "Ref 1");
}

#[tokio::test]
async fn saved_searches_round_trip_through_create_list_delete() {
    let app = TestApp::new();
    let cookie = app.signup("ada@example.com").await;

    let (status, saved, _) = app
        .send(
            Method::POST,
            "/saved-searches",
            Some(&cookie),
            Some(json!({ "query": "kinase inhibitors" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["filters"], json!({}));
    let uri = format!("/saved-searches/{}", saved["id"].as_str().unwrap());

    let (_, list, _) = app.send(Method::GET, "/saved-searches", Some(&cookie), None).await;
    assert_eq!(list[0]["query"], "kinase inhibitors");

    let (status, _, _) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
