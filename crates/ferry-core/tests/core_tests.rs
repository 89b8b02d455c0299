use std::path::PathBuf;
use std::time::Duration;

use ferry_core::{
    format_size, summarize_names, Action, MessageSource, Messages, SizeFormat, TransferConfig,
    TransferError, PREPARING_KEY,
};

#[test]
fn test_config_json_round_trip() {
    let config = TransferConfig::builder()
        .start_delay(Duration::from_secs(1))
        .summary_max_chars(12usize)
        .size_format(SizeFormat::Decimal)
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let back: TransferConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(back.start_delay, Duration::from_secs(1));
    assert_eq!(back.summary_max_chars, 12);
    assert_eq!(back.size_format, SizeFormat::Decimal);
}

#[test]
fn test_status_text_for_action() {
    let messages = Messages::english();
    let sources = vec![PathBuf::from("/data/photos"), PathBuf::from("/data/notes.txt")];
    let summary = summarize_names(&sources, 20);
    let size = format_size(1024, SizeFormat::Binary);

    let text = messages.format(&Action::Archive.message_key(), &[&summary, &size, "backup.zip"]);

    assert_eq!(text, "Archiving photos, notes.txt into backup.zip  (1 KiB)");
    assert_eq!(messages.format(PREPARING_KEY, &[]), "Preparing...");
}

#[test]
fn test_invalid_catalog() {
    let result = Messages::from_json_str("not json");
    assert!(matches!(result, Err(TransferError::InvalidCatalog { .. })));
}
