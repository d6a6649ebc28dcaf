//! Tests for the universal Record model

#[cfg(test)]
mod tests {
    use crate::models::{Identity, Record, ValidationError};
    use serde_json::json;

    #[test]
    fn test_new_record_is_unsaved() {
        let record = Record::new("page".to_string(), json!({}));

        assert!(!record.id.is_empty());
        assert_eq!(record.version, 0);
        assert!(record.is_new_record());
        assert!(record.head.is_none());
        assert!(record.tail.is_none());
    }

    #[test]
    fn test_mark_saved_bumps_version() {
        let mut record = Record::new("page".to_string(), json!({}));
        let created = record.modified_at;

        record.mark_saved();
        assert_eq!(record.version, 1);
        assert!(!record.is_new_record());
        assert!(record.modified_at >= created);
    }

    #[test]
    fn test_flag_reads_boolean_properties() {
        let record = Record::new(
            "collection".to_string(),
            json!({ "collection": true, "count": 3 }),
        );

        assert!(record.flag("collection"));
        assert!(!record.flag("count"), "non-bool values are not flags");
        assert!(!record.flag("missing"));
    }

    #[test]
    fn test_membership_helpers() {
        let mut owner = Record::new("book".to_string(), json!({}));
        let page = Identity::new("page-1");

        assert!(owner.add_member("members", page.clone()));
        assert!(!owner.add_member("members", page.clone()), "sets ignore duplicates");
        assert!(owner.has_member("members", &page));
        assert_eq!(owner.member_ids("members").count(), 1);

        assert!(owner.remove_member("members", &page));
        assert!(!owner.remove_member("members", &page));
        assert!(owner.members.is_empty(), "empty sets are pruned");
    }

    #[test]
    fn test_validate_rejects_non_object_properties() {
        let record = Record::new("page".to_string(), json!([1, 2]));

        match record.validate() {
            Err(ValidationError::InvalidProperties(msg)) => {
                assert!(msg.contains("JSON object"))
            }
            other => panic!("Expected InvalidProperties, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_blank_type() {
        let record = Record::new(" ".to_string(), json!({}));
        assert!(matches!(
            record.validate(),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip_keeps_order_summary() {
        let mut record = Record::new_with_id(Identity::new("book-1"), "book".to_string(), json!({}));
        record.head = Some(Identity::new("book-1/list_source#a"));
        record.tail = Some(Identity::new("book-1/list_source#b"));
        record.add_member("members", Identity::new("page-1"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["recordType"], "book");
        assert_eq!(json["head"], "book-1/list_source#a");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
