#![forbid(unsafe_code)]

mod common;

use common::{image, present, uuid};
use proptest::prelude::*;
use reconcile::classify::{ScanContext, classify};
use reconcile::domain::{
    ImageFile, ImageId, StatusCategory, TemplateRecord, TypeCode, VolumeKind, VolumeRecord,
};
use reconcile::reconcile;
use reconcile::stores::{Facts, KnowledgeBase};

#[derive(Debug, Clone, Copy)]
enum Registration {
    None,
    Volume,
    Template,
}

#[derive(Debug, Clone)]
struct Scenario {
    files: Vec<ImageFile>,
    facts: Facts,
}

fn registration() -> impl Strategy<Value = Registration> {
    prop_oneof![
        Just(Registration::None),
        Just(Registration::Volume),
        Just(Registration::Template),
    ]
}

fn format() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(Some("qcow2")), Just(Some("raw")), Just(Some("vmdk")), Just(None)]
}

prop_compose! {
    // Backing references may point past the last file, i.e. to a base that
    // is not on disk.
    fn scenario()(len in 1usize..10)(
        specs in prop::collection::vec(
            (format(), prop::option::of(0u8..12), registration()),
            len,
        ),
    ) -> Scenario {
        let mut files = Vec::new();
        let mut facts = Facts::default();
        for (index, (format, backing, registration)) in specs.into_iter().enumerate() {
            let id = uuid(index as u8);
            let backing = backing
                .filter(|target| *target as usize != index)
                .map(|target| format!("{}.qcow2", uuid(target)));
            files.push(image(&id, format, backing.as_deref()));
            match registration {
                Registration::None => {}
                Registration::Volume => facts
                    .volumes
                    .push(VolumeRecord::new(id.as_str(), VolumeKind::Root)),
                Registration::Template => {
                    facts.templates.push(TemplateRecord::new(id.as_str()))
                }
            }
        }
        Scenario { files, facts }
    }
}

fn is_registered(facts: &Facts, id: &ImageId) -> bool {
    facts.volumes.iter().any(|v| &v.id == id) || facts.templates.iter().any(|t| &t.id == id)
}

proptest! {
    #[test]
    fn reconciliation_is_idempotent_and_order_stable(scenario in scenario()) {
        let kb = KnowledgeBase::from_facts(scenario.facts.clone());
        let present = present(&scenario.files);
        let ctx = ScanContext { present: &present, pool: None };

        let first = reconcile(&scenario.files, &kb, &ctx, false);
        let second = reconcile(&scenario.files, &kb, &ctx, false);
        let parallel = reconcile(&scenario.files, &kb, &ctx, true);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &parallel);
    }

    #[test]
    fn flatten_iff_base_on_disk_and_unknown(scenario in scenario()) {
        let kb = KnowledgeBase::from_facts(scenario.facts.clone());
        let present = present(&scenario.files);
        let ctx = ScanContext { present: &present, pool: None };
        let reconciliation = reconcile(&scenario.files, &kb, &ctx, false);

        for (file, result) in scenario.files.iter().zip(&reconciliation.results) {
            let Some(backing) = &file.backing else {
                prop_assert!(!result.flatten_candidate);
                continue;
            };
            let base = ImageId::new(backing);
            let expected = present.contains(&base) && !is_registered(&scenario.facts, &base);
            prop_assert_eq!(result.flatten_candidate, expected);
            prop_assert_eq!(reconciliation.flatten.contains(&file.id), expected);
            if !present.contains(&base) {
                prop_assert_eq!(result.type_code, TypeCode::SnapshotBaseMissing);
            }
        }
    }

    #[test]
    fn parent_pass_only_touches_base_column(scenario in scenario()) {
        let kb = KnowledgeBase::from_facts(scenario.facts.clone());
        let present = present(&scenario.files);
        let ctx = ScanContext { present: &present, pool: None };
        let reconciliation = reconcile(&scenario.files, &kb, &ctx, false);

        for (file, annotated) in scenario.files.iter().zip(&reconciliation.results) {
            let mut plain = classify(file, &kb, &ctx).result;
            plain.base_display.clone_from(&annotated.base_display);
            prop_assert_eq!(&plain, annotated);
        }
    }

    #[test]
    fn unregistered_plain_images_depend_on_format_only(scenario in scenario()) {
        let kb = KnowledgeBase::from_facts(scenario.facts.clone());
        let present = present(&scenario.files);
        let ctx = ScanContext { present: &present, pool: None };
        let reconciliation = reconcile(&scenario.files, &kb, &ctx, false);

        for (file, result) in scenario.files.iter().zip(&reconciliation.results) {
            if file.backing.is_some() || is_registered(&scenario.facts, &file.id) {
                continue;
            }
            let expected = match file.format.as_deref() {
                Some("raw") => TypeCode::RawUnknown,
                _ => TypeCode::ImageUnknown,
            };
            prop_assert_eq!(result.type_code, expected);
            prop_assert_eq!(result.status, StatusCategory::IdleUnknown);
        }
    }
}
