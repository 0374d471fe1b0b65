use eventhub_e2e::runner::{list, Selection};
use eventhub_e2e::{catalogue, Group, WebDriverPage};
use std::collections::HashSet;

/// Scenario Catalogue Test
///
/// The catalogue covers every group of the suite, in order, with unique
/// scenario names so `--name` always selects exactly one scenario.
#[test]
fn catalogue_covers_every_group_with_unique_names() {
    let groups = catalogue::<WebDriverPage>();
    let order: Vec<Group> = groups.iter().map(|g| g.group).collect();
    assert_eq!(order, Group::all());

    let names: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.scenarios.iter().map(|s| s.name))
        .collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len(), "duplicate scenario names: {names:?}");

    for name in names {
        let selection = Selection {
            name: Some(name.to_string()),
            ..Default::default()
        };
        assert_eq!(selection.count(&groups), 1, "{name}");
    }
}

#[test]
fn every_scenario_is_tagged_with_its_area() {
    for group in catalogue::<WebDriverPage>() {
        for scenario in &group.scenarios {
            assert!(!scenario.tags.is_empty(), "{} has no tags", scenario.name);
        }
    }
}

#[test]
fn access_control_scenarios_span_roles() {
    let groups = catalogue::<WebDriverPage>();
    let access = Selection {
        tag: Some("access_control".into()),
        ..Default::default()
    };
    assert_eq!(access.count(&groups), 4);

    let smoke = Selection {
        group: Some(Group::Smoke),
        ..Default::default()
    };
    assert_eq!(smoke.count(&groups), 3);
}

#[test]
fn listing_names_group_and_tags() {
    let lines = list(&catalogue::<WebDriverPage>());
    assert!(lines.contains(&"event_management: lets a regular user RSVP to an event [events, rsvp]".to_string()));
    assert!(lines.contains(&"smoke: keeps anonymous visitors out of the dashboard [smoke, access_control]".to_string()));
}
