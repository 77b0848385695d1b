//! Discovery scenarios over recorded responses
//!
//! Each test runs the shipped generator definitions against a
//! `FixtureClient`, so no network is involved.

use serde_json::{json, Map, Value};
use stackscout::client::{ClientSettings, FixtureClient, FixtureSet};
use stackscout::inventory::{Collector, Schedule};
use stackscout::resource::registry::ProviderConfig;
use stackscout::resource::{
    build_generators, enumerate, get_generator_def, GeneratorDef, GeneratorRun, RawObjects,
    RunState,
};
use stackscout::DiscoveryError;
use std::io::Write;
use std::sync::Arc;

fn cloudformation() -> &'static GeneratorDef {
    get_generator_def("aws", "cloudformation").unwrap()
}

fn ids(resources: &[stackscout::resource::Resource]) -> Vec<&str> {
    resources.iter().map(|r| r.id()).collect()
}

/// Terminal objects are filtered out before normalization
#[tokio::test]
async fn test_deleted_stack_is_skipped() {
    let def = cloudformation();
    let client = FixtureClient::new("aws").respond(
        "ListStacks",
        json!({"StackSummaries": [
            {"StackName": "gone", "StackStatus": "DELETE_COMPLETE"},
            {"StackName": "live", "StackStatus": "CREATE_COMPLETE"}
        ]}),
    );

    let output = enumerate(def, &def.steps[0], &client, &RawObjects::new())
        .await
        .unwrap();

    assert_eq!(ids(&output.resources), vec!["live"]);
    assert_eq!(output.resources[0].kind(), "aws_cloudformation_stack");
    assert_eq!(output.resources[0].provider(), "aws");
}

/// Child objects get positional composite ids, one listing per parent
#[tokio::test]
async fn test_stack_set_instances_get_composite_ids() {
    let def = cloudformation();
    let client = FixtureClient::new("aws")
        .respond("ListStacks", json!({"StackSummaries": []}))
        .respond(
            "ListStackSets",
            json!({"Summaries": [{"StackSetName": "s1", "StackSetId": "s1"}]}),
        )
        .respond_to(
            "ListStackInstances",
            json!({"StackSetName": "s1"}),
            json!({"Summaries": [
                {"StackSetId": "s1", "Account": "111", "Region": "us-east-1"},
                {"StackSetId": "s1", "Account": "222", "Region": "us-west-2"}
            ]}),
        );

    let resources = GeneratorRun::new(def, &client).run().await.unwrap();
    let instances: Vec<&str> = resources
        .iter()
        .filter(|r| r.kind() == "aws_cloudformation_stack_set_instance")
        .map(|r| r.id())
        .collect();

    assert_eq!(instances, vec!["s1,111,us-east-1", "s1,222,us-west-2"]);
    assert_eq!(client.call_count("ListStackInstances"), 1);
}

/// Stack sets past the first page are still discovered
#[tokio::test]
async fn test_stack_sets_follow_next_token() {
    let def = cloudformation();
    let client = FixtureClient::new("aws")
        .respond("ListStacks", json!({"StackSummaries": []}))
        .respond_to(
            "ListStackSets",
            json!({"NextToken": "p2"}),
            json!({"Summaries": [{"StackSetName": "b"}]}),
        )
        .respond(
            "ListStackSets",
            json!({"Summaries": [{"StackSetName": "a"}], "NextToken": "p2"}),
        )
        .respond_to("ListStackInstances", json!({"StackSetName": "a"}), json!({}))
        .respond_to("ListStackInstances", json!({"StackSetName": "b"}), json!({}));

    let resources = GeneratorRun::new(def, &client).run().await.unwrap();
    let sets: Vec<&str> = resources
        .iter()
        .filter(|r| r.kind() == "aws_cloudformation_stack_set")
        .map(|r| r.id())
        .collect();

    assert_eq!(sets, vec!["a", "b"]);
    assert_eq!(client.call_count("ListStackSets"), 2);
    assert_eq!(client.call_count("ListStackInstances"), 2);
}

/// WAF listings page with NextMarker
#[tokio::test]
async fn test_web_acls_follow_next_marker() {
    let def = get_generator_def("aws", "wafregional").unwrap();
    let client = FixtureClient::new("aws")
        .respond_to(
            "ListWebACLs",
            json!({"NextMarker": "m1"}),
            json!({"WebACLs": [{"WebACLId": "acl-2", "Name": "second"}]}),
        )
        .respond(
            "ListWebACLs",
            json!({"WebACLs": [{"WebACLId": "acl-1", "Name": "first"}], "NextMarker": "m1"}),
        );

    let output = enumerate(def, &def.steps[0], &client, &RawObjects::new())
        .await
        .unwrap();

    assert_eq!(ids(&output.resources), vec!["acl-1", "acl-2"]);
    assert_eq!(client.call_count("ListWebACLs"), 2);
}

/// A dedicated parent listing works the same as reusing an earlier step
#[tokio::test]
async fn test_parent_listing_fans_out() {
    let content = json!({
        "provider": "aws",
        "generators": {
            "sets": {
                "display_name": "Instances only",
                "steps": [{
                    "kind": "aws_cloudformation_stack_set_instance",
                    "list": {"operation": "ListStackInstances", "response_path": "Summaries"},
                    "parent": {
                        "source": {
                            "listing": {"operation": "ListStackSets", "response_path": "Summaries"}
                        },
                        "params": {"StackSetName": "StackSetName"}
                    },
                    "id_fields": ["StackSetId", "Account", "Region"]
                }]
            }
        }
    })
    .to_string();
    let def = ProviderConfig::from_json(&content).unwrap().generators["sets"].clone();

    let client = FixtureClient::new("aws")
        .respond(
            "ListStackSets",
            json!({"Summaries": [{"StackSetName": "a"}, {"StackSetName": "b"}]}),
        )
        .respond_to(
            "ListStackInstances",
            json!({"StackSetName": "a"}),
            json!({"Summaries": [{"StackSetId": "a:1", "Account": "111", "Region": "eu-west-1"}]}),
        )
        .respond_to(
            "ListStackInstances",
            json!({"StackSetName": "b"}),
            json!({"Summaries": [{"StackSetId": "b:1", "Account": "222", "Region": ""}]}),
        );

    let output = enumerate(&def, &def.steps[0], &client, &RawObjects::new())
        .await
        .unwrap();

    // Missing components keep their slot
    assert_eq!(ids(&output.resources), vec!["a:1,111,eu-west-1", "b:1,222,"]);
}

/// A failing step voids everything the generator gathered
#[tokio::test]
async fn test_failed_step_voids_generator() {
    let def = get_generator_def("aws", "wafregional").unwrap();
    let acls: Vec<Value> = (0..5)
        .map(|i| json!({"WebACLId": format!("acl-{}", i), "Name": format!("acl {}", i)}))
        .collect();
    let client = FixtureClient::new("aws")
        .respond("ListWebACLs", json!({"WebACLs": acls}))
        .fail("ListByteMatchSets", 500, "WAFInternalErrorException")
        .respond("ListGeoMatchSets", json!({"GeoMatchSets": []}));

    let mut run = GeneratorRun::new(def, &client);
    let err = run.run().await.unwrap_err();

    assert!(matches!(
        err,
        DiscoveryError::Api { status: 500, ref operation, .. } if operation == "ListByteMatchSets"
    ));
    assert_eq!(run.state(), RunState::Failed { step: 1 });
    assert_eq!(client.call_count("ListWebACLs"), 1);
    assert_eq!(client.call_count("ListGeoMatchSets"), 0);
}

/// An empty listing is a successful, empty step
#[tokio::test]
async fn test_empty_listing_is_not_an_error() {
    let def = get_generator_def("octopusdeploy", "tagset").unwrap();
    let client = FixtureClient::new("octopusdeploy").respond("tagsets/all", json!([]));

    let output = enumerate(def, &def.steps[0], &client, &RawObjects::new())
        .await
        .unwrap();

    assert!(output.resources.is_empty());
}

/// An item without its native id fails the step
#[tokio::test]
async fn test_item_without_id_is_malformed() {
    let def = get_generator_def("octopusdeploy", "environment").unwrap();
    let client = FixtureClient::new("octopusdeploy")
        .respond("environments/all", json!([{"Id": "Environments-1"}, {"Name": "orphan"}]));

    let err = enumerate(def, &def.steps[0], &client, &RawObjects::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::Malformed { .. }));
}

/// The wafregional generator covers every listable kind, in order
#[tokio::test]
async fn test_wafregional_lists_every_kind() {
    let def = get_generator_def("aws", "wafregional").unwrap();
    let mut client = FixtureClient::new("aws");
    for step in &def.steps {
        let mut item = Map::new();
        item.insert(step.id_fields[0].clone(), json!(format!("{}-1", step.kind)));
        item.insert("Name".to_string(), json!(""));
        let mut body = json!({});
        body[step.list.response_path.as_str()] = json!([item]);
        client = client.respond(&step.list.operation, body);
    }

    let resources = GeneratorRun::new(def, &client).run().await.unwrap();

    assert_eq!(resources.len(), 12);
    let kinds: Vec<&str> = resources.iter().map(|r| r.kind()).collect();
    let expected: Vec<&str> = def.steps.iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(kinds, expected);
    assert!(def
        .unsupported
        .iter()
        .any(|u| u.kind == "aws_wafregional_web_acl_association"));
}

/// A fixture file drives a whole collection run, with one failing generator
#[tokio::test]
async fn test_collection_from_fixture_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(
        file,
        r#"
aws/cloudformation:
  ListStacks:
    - response:
        StackSummaries:
          - {{ StackName: app, StackStatus: CREATE_COMPLETE }}
        NextToken: t1
    - params: {{ NextToken: t1 }}
      response:
        StackSummaries:
          - {{ StackName: db, StackStatus: UPDATE_COMPLETE }}
  ListStackSets:
    - response: {{ Summaries: [] }}
octopusdeploy/environment:
  environments/all:
    - error: {{ status: 401, message: Unauthorized }}
"#
    )
    .unwrap();

    let settings = ClientSettings {
        fixtures: Some(Arc::new(FixtureSet::load(file.path()).unwrap())),
        ..ClientSettings::default()
    };
    let keys = vec![
        "aws/cloudformation".to_string(),
        "octopusdeploy/environment".to_string(),
    ];

    for schedule in [Schedule::Sequential, Schedule::Concurrent] {
        let generators = build_generators(&keys, &settings).unwrap();
        let inventory = Collector::new(generators)
            .schedule(schedule)
            .collect()
            .await
            .unwrap();

        assert_eq!(ids(&inventory.resources), vec!["app", "db"]);
        assert_eq!(inventory.failures.len(), 1);
        assert_eq!(inventory.failures[0].generator, "octopusdeploy/environment");
        assert!(!inventory.is_complete());
    }
}
