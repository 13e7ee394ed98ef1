use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use cgmath::{Quaternion, Vector3};
use inlinable_string::InlinableString;
use uuid::Uuid;

use satchel::prelude::*;
use satchel::provider::{Manifest, ManifestItem};

#[derive(Debug, Clone, PartialEq)]
struct Texture {
    id: u32,
}

fn testbed() -> AssetSystem {
    let _ = env_logger::try_init();
    AssetSystem::new(AssetSystemParams::default())
}

/// Builds a throwaway package directory with a manifest and one asset file
/// per (path, contents) pair.
fn package_dir(assets: &[(&str, &[u8])]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("satchel-test-{}", rand::random::<u64>()));
    fs::create_dir_all(&dir).unwrap();

    let mut manifest = Manifest::new();
    for (i, (path, contents)) in assets.iter().enumerate() {
        let location = format!("{:08x}", i);
        fs::write(dir.join(&location), contents).unwrap();

        manifest.items.push(ManifestItem {
            path: InlinableString::from(*path),
            uuid: Uuid::from_bytes([i as u8 + 1; 16]),
            location: InlinableString::from(location.as_str()),
        });
    }

    let mut file = fs::File::create(dir.join(".MANIFEST")).unwrap();
    manifest.save_into(&mut file).unwrap();
    dir
}

#[test]
fn prefix_routing() {
    assert_eq!(refine_name("res#Foo"), (ProviderKind::Resource, "Foo"));
    assert_eq!(refine_name("Foo"), (ProviderKind::Bundle, "Foo"));
    assert_eq!(refine_name("res#"), (ProviderKind::Bundle, "res#"));
    assert_eq!(refine_name(""), (ProviderKind::Bundle, ""));
    assert_eq!(
        refine_name("res#textures/crate.png"),
        (ProviderKind::Resource, "textures/crate.png")
    );
}

#[test]
fn loads_registered_resources() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });

    let v = sys.load::<Texture>("res#pig", LoadOptions::default(), None);
    assert_eq!(v.map(|v| v.id), Some(7));
    assert!(sys.contains("res#pig"));
    assert_eq!(sys.peek::<Texture>("res#pig").map(|v| v.id), Some(7));

    sys.unload("res#pig", LoadOptions::default(), false);
    assert!(!sys.contains("res#pig"));
    assert!(sys.peek::<Texture>("res#pig").is_none());
}

#[test]
fn resources_can_be_unregistered() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });
    assert_eq!(sys.resources().len(), 1);

    sys.resources().unregister("pig");
    assert_eq!(sys.resources().len(), 0);
    assert!(sys
        .load::<Texture>("res#pig", LoadOptions::default(), None)
        .is_none());
}

#[test]
fn unknown_assets_come_back_as_none() {
    let sys = testbed();

    assert!(sys
        .load::<Texture>("res#missing", LoadOptions::default(), None)
        .is_none());
    assert!(sys
        .load::<Texture>("missing", LoadOptions::default(), None)
        .is_none());
    assert!(!sys.contains("res#missing"));
}

#[test]
fn type_mismatch_comes_back_as_none() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });

    assert!(sys
        .load::<String>("res#pig", LoadOptions::default(), None)
        .is_none());

    // The failed load released its acquisition again.
    assert!(!sys.contains("res#pig"));
}

#[test]
fn duplicate_loads_share_the_cached_value() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });

    let a = sys
        .load::<Texture>("res#pig", LoadOptions::default(), None)
        .unwrap();
    let b = sys
        .load::<Texture>("res#pig", LoadOptions::default(), None)
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn instantiate_produces_an_independent_copy() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });

    let placement = Placement {
        position: Vector3::new(1.0, 2.0, 3.0),
        rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        parent: Some(InlinableString::from("scene/root")),
        world_position_stays: true,
    };

    let original = sys
        .load::<Texture>("res#pig", LoadOptions::default(), None)
        .unwrap();
    let duplicated = sys
        .instantiate::<Texture>("res#pig", placement.clone(), LoadOptions::default(), None)
        .unwrap();

    assert_eq!(*original, *duplicated);
    assert!(!Arc::ptr_eq(&original, &duplicated));
}

#[test]
fn placement_is_passed_through_to_the_provider() {
    let sys = testbed();
    sys.resources().register("pig", Texture { id: 7 });

    let placement = Placement {
        position: Vector3::new(4.0, 5.0, 6.0),
        ..Placement::default()
    };

    let key = AssetKey::new("res", "pig").unwrap();
    let handle = sys.resources().fetch(&key).unwrap();
    let duplicated = sys.resources().duplicate(&handle, &placement).unwrap();

    assert_eq!(duplicated.placement(), Some(&placement));
}

#[test]
fn preload_skips_blank_names() {
    let sys = testbed();
    sys.resources().register("b", Texture { id: 1 });

    let calls = Arc::new(Mutex::new(Vec::new()));
    let observed = calls.clone();
    let progression = move |fraction: f32, current: usize, total: usize| {
        observed.lock().unwrap().push((fraction, current, total));
    };
    let progression: &Progression = &progression;

    sys.preload(
        &["", "res#b", "   "],
        LoadOptions::default(),
        Some(progression),
    );

    assert!(sys.contains("res#b"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(*calls.last().unwrap(), (1.0, 1, 1));
}

#[test]
fn preload_reports_fractional_progress() {
    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });
    sys.resources().register("b", Texture { id: 2 });

    let calls = Arc::new(Mutex::new(Vec::new()));
    let observed = calls.clone();
    let progression = move |fraction: f32, current: usize, total: usize| {
        observed.lock().unwrap().push((fraction, current, total));
    };
    let progression: &Progression = &progression;

    // The unknown name still advances the batch instead of stalling it.
    sys.preload(
        &["res#a", "res#missing", "res#b"],
        LoadOptions::default(),
        Some(progression),
    );

    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec![
        (1.0 / 3.0, 1, 3),
        (2.0 / 3.0, 2, 3),
        (1.0, 3, 3),
    ]);

    assert!(sys.contains("res#a"));
    assert!(!sys.contains("res#missing"));
    assert!(sys.contains("res#b"));
}

#[test]
fn preload_in_background() {
    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });
    sys.resources().register("b", Texture { id: 2 });

    sys.preload_background(&["res#a", "res#b"], LoadOptions::default(), None);

    // Terminating drains the queued job before the workers exit.
    sys.terminate();

    assert!(sys.contains("res#a"));
    assert!(sys.contains("res#b"));
}

#[test]
fn preload_tagged_groups_the_batch() {
    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });
    sys.resources().register("b", Texture { id: 2 });

    sys.preload_tagged(9, &["res#a", "res#b"], LoadOptions::default(), None);

    assert!(sys.contains_tagged(9, "res#a"));
    assert!(sys.contains_tagged(9, "res#b"));

    sys.release_group(9, false);
    assert!(!sys.contains("res#a"));
    assert!(!sys.contains("res#b"));
}

#[test]
fn unload_tagged_drops_the_membership() {
    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });

    sys.load_tagged::<Texture>(3, "res#a", LoadOptions::default(), None)
        .unwrap();
    sys.unload_tagged(3, "res#a", LoadOptions::default(), false);

    assert!(!sys.contains("res#a"));
    assert!(!sys.contains_tagged(3, "res#a"));
}

#[test]
fn group_tagged_loads_release_in_bulk() {
    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });
    sys.resources().register("b", Texture { id: 2 });

    sys.load_tagged::<Texture>(5, "res#a", LoadOptions::default(), None)
        .unwrap();
    sys.load_tagged::<Texture>(5, "res#b", LoadOptions::default(), None)
        .unwrap();

    assert!(sys.contains_tagged(5, "res#a"));
    assert!(sys.contains_tagged(5, "res#b"));

    sys.release_group(5, false);

    assert!(!sys.contains("res#a"));
    assert!(!sys.contains("res#b"));
    assert!(!sys.contains_tagged(5, "res#a"));
}

#[test]
fn loads_from_a_mounted_package() {
    let dir = package_dir(&[("pig.txt", b"pigment"), ("cow.txt", b"milk")]);

    let sys = testbed();
    sys.bundles().attach("main", &dir).unwrap();

    let v = sys.load::<Vec<u8>>("pig.txt", LoadOptions::default(), None);
    assert_eq!(v.map(|v| (*v).clone()), Some(b"pigment".to_vec()));

    sys.unload("pig.txt", LoadOptions::default(), false);
    assert!(!sys.contains("pig.txt"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn packages_can_be_detached() {
    let dir = package_dir(&[("pig.txt", b"pigment")]);

    let sys = testbed();
    sys.bundles().attach("main", &dir).unwrap();
    assert!(sys.bundles().is_attached("main"));

    sys.load::<Vec<u8>>("pig.txt", LoadOptions::default(), None)
        .unwrap();

    sys.bundles().detach("main");
    assert!(!sys.bundles().is_attached("main"));

    // Already resident assets stay alive until released.
    assert!(sys.contains("pig.txt"));

    sys.unload("pig.txt", LoadOptions::default(), false);
    assert!(sys
        .load::<Vec<u8>>("pig.txt", LoadOptions::default(), None)
        .is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn packages_can_be_overridden_per_call() {
    let dir = package_dir(&[("pig.txt", b"other pigment")]);

    let sys = testbed();
    sys.bundles().attach("extra", &dir).unwrap();

    // Nothing mounted under the default package.
    assert!(sys
        .load::<Vec<u8>>("pig.txt", LoadOptions::default(), None)
        .is_none());

    let opts = LoadOptions {
        package: Some(InlinableString::from("extra")),
        ..LoadOptions::default()
    };
    let v = sys.load::<Vec<u8>>("pig.txt", opts, None);
    assert_eq!(v.map(|v| (*v).clone()), Some(b"other pigment".to_vec()));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn raw_file_path_points_into_the_package() {
    let dir = package_dir(&[("pig.txt", b"pigment")]);

    let sys = testbed();
    sys.bundles().attach("main", &dir).unwrap();

    let path = sys.raw_file_path("pig.txt", LoadOptions::default());
    assert_eq!(path, Some(dir.join("00000000")));

    // The probe acquisition was force-unloaded again.
    assert!(!sys.contains("pig.txt"));

    // Resource names have no on-disk location.
    assert!(sys.raw_file_path("res#pig", LoadOptions::default()).is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn release_all_clears_both_namespaces() {
    let dir = package_dir(&[("pig.txt", b"pigment")]);

    let sys = testbed();
    sys.resources().register("a", Texture { id: 1 });
    sys.bundles().attach("main", &dir).unwrap();

    sys.load::<Texture>("res#a", LoadOptions::default(), None)
        .unwrap();
    sys.load::<Vec<u8>>("pig.txt", LoadOptions::default(), None)
        .unwrap();

    sys.release_all();

    assert!(!sys.contains("res#a"));
    assert!(!sys.contains("pig.txt"));

    let _ = fs::remove_dir_all(&dir);
}
