use anyhow::Result;
use opencv::core::{CV_8UC3, Mat, Scalar};
use receipt_verifier::{
    ReceiptAnalyzer, VerifierConfig,
    classification::{Breakdown, Classification},
    error::{ErrorKind, VerifyError},
    ocr::{FixtureRecognizer, Recognition, RecognizerWrapper, TextRecognizer, parse_response},
    text::{RecognizedWord, TemplateVariant},
    vision::encode_png,
};

const SERVICE_RESPONSE: &str = r#"{
    "ParsedResults": [{
        "TextOverlay": {
            "Lines": [
                {"Words": [{"WordText": "Interbank", "Left": 338.0, "Top": 80.0, "Height": 20.0, "Width": 90.0}]},
                {"Words": [
                    {"WordText": "¡Pago", "Left": 250.0, "Top": 347.0, "Height": 30.0, "Width": 80.0},
                    {"WordText": "exitoso!", "Left": 404.4, "Top": 346.6, "Height": 30.0, "Width": 110.0}
                ]}
            ],
            "HasOverlay": true
        },
        "FileParseExitCode": 1,
        "ParsedText": "Interbank\r\n¡Pago exitoso!\r\n",
        "ErrorMessage": "",
        "ErrorDetails": ""
    }],
    "OCRExitCode": 1,
    "IsErroredOnProcessing": false,
    "ProcessingTimeInMilliseconds": "343"
}"#;

fn blank_png() -> Result<Vec<u8>> {
    let img = Mat::new_rows_cols_with_default(120, 80, CV_8UC3, Scalar::new(200.0, 200.0, 200.0, 0.0))?;
    Ok(encode_png(&img)?)
}

fn analyzer_with(words: Vec<RecognizedWord>) -> ReceiptAnalyzer {
    ReceiptAnalyzer::new(
        VerifierConfig::default(),
        RecognizerWrapper::Fixture(FixtureRecognizer::from_words(words)),
    )
}

#[test]
fn test_parse_service_response() -> Result<()> {
    let recognition = parse_response(SERVICE_RESPONSE)?;
    assert_eq!(recognition.words.len(), 3);
    assert_eq!(recognition.words[2].text, "exitoso!");
    assert_eq!(recognition.words[2].position(), (404, 347));
    assert!(recognition.full_text.starts_with("Interbank"));
    Ok(())
}

#[test]
fn test_service_errors_are_collaborator_failures() {
    let flagged = parse_response(r#"{"IsErroredOnProcessing": true, "ErrorMessage": "Invalid API key"}"#)
        .unwrap_err();
    assert!(matches!(&flagged, VerifyError::RecognitionFailed(m) if m == "Invalid API key"));
    assert_eq!(flagged.kind(), ErrorKind::Collaborator);

    let malformed = parse_response(r#"{"OCRExitCode": 99}"#).unwrap_err();
    assert_eq!(malformed.kind(), ErrorKind::Collaborator);
}

#[tokio::test]
async fn test_fixture_replays_raw_response() -> Result<()> {
    let fixture = FixtureRecognizer::from_json(SERVICE_RESPONSE)?;
    let recognition: Recognition = fixture.recognize(&[]).await?;
    assert_eq!(recognition.words.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_text_check_with_exact_words() -> Result<()> {
    let sent = &TemplateVariant::builtin()[0];
    let words = sent
        .fields
        .iter()
        .map(|f| RecognizedWord::new(&f.expected_text, f.reference_position.0, f.reference_position.1))
        .collect();

    let report = analyzer_with(words).verify_text(&blank_png()?).await?;
    assert_eq!(report.percentage, 100.0);
    assert_eq!(report.classification, Classification::Authentic);
    assert!(report.is_valid);
    assert_eq!(report.matched.as_deref(), Some("sent"));
    match report.breakdown {
        Breakdown::Fields {
            words_detected,
            fields_found,
            ref fields,
        } => {
            assert_eq!(words_detected, 12);
            assert_eq!(fields_found, 12);
            assert_eq!(fields.len(), 12);
        }
        other => panic!("unexpected breakdown {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_text_check_without_words() -> Result<()> {
    let report = analyzer_with(Vec::new()).verify_text(&blank_png()?).await?;
    assert_eq!(report.percentage, 0.0);
    assert_eq!(report.classification, Classification::Altered);
    assert_eq!(report.diagnostic.as_deref(), Some("no text detected"));
    Ok(())
}

#[tokio::test]
async fn test_text_check_rejects_bad_input() -> Result<()> {
    let analyzer = analyzer_with(vec![RecognizedWord::new("Interbank", 338, 80)]);

    let err = analyzer.verify_text(&[]).await.unwrap_err();
    assert!(matches!(err, VerifyError::EmptyImage));

    let err = analyzer.verify_text(b"%PDF-1.4 not an image").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    Ok(())
}

#[tokio::test]
async fn test_field_extraction_from_transcript() -> Result<()> {
    let transcript = serde_json::json!({
        "full_text": "Interbank\n¡Pago exitoso!\nS/ 25.50\nEnviado a:\nMaria Lopez\n987 654 321\nCódigo de operación:\n12345678",
        "words": []
    });
    let fixture = FixtureRecognizer::from_json(&transcript.to_string())?;
    let analyzer = ReceiptAnalyzer::new(VerifierConfig::default(), RecognizerWrapper::Fixture(fixture));

    let report = analyzer.extract_fields(&blank_png()?).await?;
    assert!(report.sent_layout);
    assert_eq!(report.fields.amount, Some(25.5));
    assert_eq!(report.fields.receiver.as_deref(), Some("Maria Lopez"));
    assert_eq!(report.fields.operation_code.as_deref(), Some("12345678"));
    assert!(report.fields.warnings.iter().any(|w| w.contains("Date")));
    Ok(())
}

#[tokio::test]
async fn test_field_extraction_flags_tampered_layout() -> Result<()> {
    let transcript = serde_json::json!({
        "full_text": "Interbank\n¡Pago exitoso!\nS/ 25.50\nEnviado a:\nREEMBOLSO pendiente",
        "words": [],
        "line_centers": [90.0, 130.0, 170.0, 210.0, 600.0]
    });
    let fixture = FixtureRecognizer::from_json(&transcript.to_string())?;
    let analyzer = ReceiptAnalyzer::new(VerifierConfig::default(), RecognizerWrapper::Fixture(fixture));

    let report = analyzer.extract_fields(&blank_png()?).await?;
    assert!(report.sent_layout);
    assert_eq!(report.fields.flagged_words, vec!["REEMBOLSO"]);
    assert!(
        report
            .fields
            .warnings
            .iter()
            .any(|w| w.starts_with("Irregular vertical spacing")),
        "{:?}",
        report.fields.warnings
    );
    assert!(!report.fields.warnings.iter().any(|w| w.starts_with("Overlay has")));
    Ok(())
}

#[tokio::test]
async fn test_unknown_layout_is_flagged() -> Result<()> {
    let fixture = FixtureRecognizer::from_words(vec![RecognizedWord::new("Recibiste", 103, 426)]);
    let analyzer = ReceiptAnalyzer::new(VerifierConfig::default(), RecognizerWrapper::Fixture(fixture));

    let report = analyzer.extract_fields(&blank_png()?).await?;
    assert!(!report.sent_layout);
    assert_eq!(report.fields.warnings[0], "receipt layout not recognized");
    Ok(())
}

#[test]
fn test_prefilter_on_flat_image() -> Result<()> {
    let analyzer = analyzer_with(Vec::new());
    let report = analyzer.prefilter(&blank_png()?)?;
    assert!(!report.color.is_brand());
    assert_eq!(report.sharpness.classification, Classification::Altered);
    Ok(())
}
