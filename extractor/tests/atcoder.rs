use kyotest_extractor::*;

const ABC123_C: &str = include_str!("fixtures/abc123_c.html");
const ENGLISH_ONLY: &str = include_str!("fixtures/english_only.html");

#[test]
fn should_extract_bilingual_problem_page() {
    let d = extract(ABC123_C);

    assert_eq!(d.problem_id, "C");
    assert_eq!(d.title, "Sum of Two");
    assert_eq!(d.contest_slug, "abc123");
    assert_eq!(d.contest_number, "123");
    assert_eq!(d.unpaired_blocks, 0);
    assert_eq!(
        d.samples,
        vec![
            Sample::new("入力例 1", "1 2\n", "出力例 1", "3\n"),
            Sample::new("入力例 2", "100 -7\n", "出力例 2", "93\n"),
        ]
    );
    assert_eq!(d.headline().as_deref(), Some("ABC 123 - C: Sum of Two"));
}

#[test]
fn should_fall_back_to_english_markers() {
    let d = extract(ENGLISH_ONLY);

    assert_eq!(d.problem_id, "A");
    assert_eq!(d.title, "Welcome to AtCoder");
    assert_eq!(d.contest_slug, "practice");
    assert_eq!(d.contest_number, "");
    assert_eq!(d.unpaired_blocks, 1);
    assert_eq!(
        d.samples,
        vec![Sample::new(
            "Sample Input 1",
            "1\n2 3\ntest\n",
            "Sample Output 1",
            "6 test\n"
        )]
    );
}

#[test]
fn should_return_empty_descriptor_for_degenerate_input() {
    for markup in ["", "<html></html>", "<<<>>", "plain text", "<div class=\"part\">"] {
        let d = extract(markup);
        assert_eq!(d, ProblemDescriptor::default(), "markup: {:?}", markup);
        assert!(d.is_empty());
    }
}

#[test]
fn should_survive_truncated_markup() {
    let truncated = &ABC123_C[..ABC123_C.find("出力例 2").unwrap()];
    let d = extract(truncated);

    assert_eq!(d.problem_id, "C");
    assert_eq!(d.samples.len(), 1);
    assert_eq!(d.unpaired_blocks, 1);
}

#[test]
fn should_pair_min_of_inputs_and_outputs() {
    fn part(h: &str, pre: &str) -> String {
        format!(r#"<div class="part"><h3>{}</h3><pre>{}</pre></div>"#, h, pre)
    }
    for (n, m) in [(0, 3), (3, 0), (2, 5), (4, 4), (5, 1)] {
        let mut html = String::new();
        for i in 0..n {
            html += &part(&format!("入力例 {}", i + 1), &format!("in{}", i));
        }
        for i in 0..m {
            html += &part(&format!("出力例 {}", i + 1), &format!("out{}", i));
        }
        let d = extract(&html);
        assert_eq!(d.samples.len(), n.min(m));
        assert_eq!(d.unpaired_blocks, n.max(m) - n.min(m));
        for (i, s) in d.samples.iter().enumerate() {
            assert_eq!(s.input_text, format!("in{}", i));
            assert_eq!(s.expected_output_text, format!("out{}", i));
        }
    }
}

#[test]
fn should_recognize_fixture_as_problem_markup() {
    assert!(looks_like_problem_markup(ABC123_C));
    assert!(!looks_like_problem_markup(""));
}

#[test]
fn descriptor_should_roundtrip_as_json() {
    let d = extract(ABC123_C);
    let json = serde_json::to_string(&d).unwrap();
    let back: ProblemDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
}
