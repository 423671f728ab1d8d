//! End-to-end catalog scenarios, run against both store backends.

use satcat_catalog::{CatalogError, ComponentPatch, assemble_forest};
use satcat_test_utils::{
    ComponentFactory, TestContext, assert_child_names, assert_is_root, assert_no_self_parents,
    assert_nodes_unique, find_node, init_test_logging,
};

fn contexts() -> Vec<(&'static str, TestContext)> {
    init_test_logging();
    vec![("memory", TestContext::new()), ("sqlite", TestContext::sqlite())]
}

#[tokio::test]
async fn seeded_battery_assembly_has_expected_shape() {
    for (backend, ctx) in contexts() {
        let catalog = ctx.seeded().await;
        assert_eq!(catalog.len(), 7, "{backend}");

        let assembly = ctx.id_of("Battery Assembly").await;
        let tree = ctx.service.component_tree(assembly).await.unwrap();
        assert_child_names(&tree, &["Li-Ion Battery", "Battery Bracket"]);

        let battery = &tree.children[0];
        assert_child_names(battery, &["Li-Ion Cell"]);
        assert_eq!(battery.children[0].quantity, 200, "{backend}");

        let bracket = catalog
            .iter()
            .find(|v| v.component.name == "Battery Bracket")
            .unwrap();
        assert_eq!(
            bracket.subsystem.as_ref().map(|s| s.name.as_str()),
            Some("Structures"),
            "{backend}"
        );
    }
}

#[tokio::test]
async fn seed_is_idempotent() {
    for (backend, ctx) in contexts() {
        let first = ctx.seeded().await;
        let second = ctx.seeded().await;
        assert_eq!(first.len(), second.len(), "{backend}");
        assert_eq!(ctx.service.list_subsystems().await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn seed_skips_a_non_empty_catalog() {
    for (backend, ctx) in contexts() {
        ctx.create(ComponentFactory::root("Existing")).await;
        let catalog = ctx.seeded().await;
        assert_eq!(catalog.len(), 1, "{backend}");
        assert_eq!(catalog[0].component.name, "Existing");
    }
}

#[tokio::test]
async fn moving_bracket_under_solar_array() {
    for (backend, ctx) in contexts() {
        ctx.seeded().await;
        let bracket = ctx.id_of("Battery Bracket").await;
        let array = ctx.id_of("Solar Array").await;

        let patch = ComponentPatch {
            parent_id: Some(Some(array)),
            ..ComponentPatch::default()
        };
        let moved = ctx.service.update_component(bracket, patch).await.unwrap();
        assert_eq!(moved.component.parent_id, Some(array), "{backend}");

        let forest = ctx.service.component_forest().await.unwrap();
        let assembly = find_node(&forest, "Battery Assembly").unwrap();
        assert_child_names(assembly, &["Li-Ion Battery"]);
        let array = find_node(&forest, "Solar Array").unwrap();
        assert_child_names(array, &["Battery Bracket", "Solar Panel", "Array Harness"]);
    }
}

#[tokio::test]
async fn deleting_a_parent_promotes_children() {
    for (backend, ctx) in contexts() {
        ctx.seeded().await;
        let battery = ctx.id_of("Li-Ion Battery").await;
        ctx.service.delete_component(battery).await.unwrap();

        let cell = ctx.id_of("Li-Ion Cell").await;
        let cell = ctx.service.get_component(cell).await.unwrap();
        assert_is_root(&cell);

        let roots = ctx.service.list_components(true).await.unwrap();
        let names: Vec<&str> = roots.iter().map(|v| v.component.name.as_str()).collect();
        assert_eq!(names, vec!["Battery Assembly", "Li-Ion Cell", "Solar Array"], "{backend}");

        let err = ctx.service.delete_component(battery).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }), "{backend}");
    }
}

#[tokio::test]
async fn deleting_a_subsystem_clears_references() {
    for (backend, ctx) in contexts() {
        let catalog = ctx.seeded().await;
        let structures = catalog
            .iter()
            .find_map(|v| v.subsystem.clone().filter(|s| s.name == "Structures"))
            .unwrap();

        ctx.service.delete_subsystem(structures.id).await.unwrap();
        let bracket = ctx.id_of("Battery Bracket").await;
        let bracket = ctx.service.get_component(bracket).await.unwrap();
        assert_eq!(bracket.component.subsystem_id, None, "{backend}");
        assert!(bracket.subsystem.is_none());

        let err = ctx
            .service
            .delete_subsystem(structures.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }), "{backend}");
    }
}

#[tokio::test]
async fn duplicate_create_leaves_store_unchanged() {
    for (backend, ctx) in contexts() {
        ctx.create(ComponentFactory::root("Bus")).await;
        let err = ctx
            .service
            .create_component(ComponentFactory::root("Bus"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }), "{backend}");
        assert_eq!(ctx.service.list_components(false).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn cycles_are_rejected_on_both_backends() {
    for (backend, ctx) in contexts() {
        let a = ctx.create(ComponentFactory::root("A")).await.component.id;
        let b = ctx.create(ComponentFactory::child("B", a)).await.component.id;

        let patch = ComponentPatch {
            parent_id: Some(Some(b)),
            ..ComponentPatch::default()
        };
        let err = ctx.service.update_component(a, patch).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }), "{backend}");

        let all = ctx.service.list_components(false).await.unwrap();
        assert_no_self_parents(&all);
        let components: Vec<_> = all.into_iter().map(|v| v.component).collect();
        let forest = assemble_forest(&components);
        assert_nodes_unique(&forest);
        assert_eq!(forest.len(), 1);
    }
}

#[tokio::test]
async fn patch_clears_nullable_fields_and_rejects_required_nulls() {
    for (backend, ctx) in contexts() {
        let eps = ctx.service.create_subsystem("EPS".to_string()).await.unwrap();
        let part = ctx
            .create(ComponentFactory::bought_part("Fuse", None, Some(eps.id)))
            .await;
        let id = part.component.id;

        let clear = ComponentPatch {
            part_number: Some(None),
            subsystem_id: Some(None),
            ..ComponentPatch::default()
        };
        let cleared = ctx.service.update_component(id, clear).await.unwrap();
        assert_eq!(cleared.component.part_number, None, "{backend}");
        assert_eq!(cleared.component.subsystem_id, None);
        assert_eq!(cleared.component.wbs.as_deref(), Some("1.1"));

        let null_mass = ComponentPatch {
            mass_kg: Some(None),
            ..ComponentPatch::default()
        };
        let err = ctx.service.update_component(id, null_mass).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }), "{backend}");
    }
}

#[tokio::test]
async fn export_renders_the_seeded_catalog() {
    for (backend, ctx) in contexts() {
        ctx.seeded().await;
        let bytes = ctx.service.export_workbook().await.unwrap();
        assert!(bytes.starts_with(b"PK"), "{backend}");
    }
}
