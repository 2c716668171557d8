use lazy_regex::{lazy_regex, Lazy, Regex};
use scraper::{ElementRef, Html};

use crate::{
    model::*,
    util::{self, DocExt, ElementRefExt},
};

static RE_TASK_TITLE: Lazy<Regex> = lazy_regex!(r"([A-Z]) - (.+)");
static RE_CONTEST_PATH: Lazy<Regex> = lazy_regex!(r"^/contests/([^/?#]+)");

pub const CONTEST_FAMILY_PREFIX: &str = "abc";

/// Inline text of the "Copy" button rendered inside every sample heading.
pub const DECORATIVE_TOKEN: &str = "Copy";

struct SampleMarkers {
    input: &'static str,
    output: &'static str,
}

/// Tried in order; the first set that classifies at least one section wins.
/// Bilingual pages carry every section twice, so only one language may be used.
const MARKERS: &[SampleMarkers] = &[
    SampleMarkers {
        input: "入力例",
        output: "出力例",
    },
    SampleMarkers {
        input: "sample input",
        output: "sample output",
    },
];

/// A `div.part` that has both a heading and a preformatted block.
struct Section {
    heading: String,
    text: String,
}

/// Extracts problem id, title, contest number and samples from a problem page.
///
/// Never fails: whatever cannot be found is left empty.
pub fn extract(markup: &str) -> ProblemDescriptor {
    let doc = Html::parse_document(markup);

    let (problem_id, title) = scrape_task_title(&doc).unwrap_or_default();
    let contest_slug = scrape_contest_slug(&doc).unwrap_or_default();
    let contest_number = contest_slug
        .strip_prefix(CONTEST_FAMILY_PREFIX)
        .unwrap_or_default()
        .to_owned();

    let sections = scrape_sections(&doc);
    let (inputs, outputs) = classify_sections(&sections);
    let unpaired_blocks = inputs.len().abs_diff(outputs.len());
    if unpaired_blocks > 0 {
        log::warn!(
            "Found {} input and {} output samples; dropping {} unpaired block(s)",
            inputs.len(),
            outputs.len(),
            unpaired_blocks
        );
    }

    let samples: Vec<_> = inputs
        .into_iter()
        .zip(outputs)
        .map(|(input, output)| Sample {
            input_label: clean_label(&input.heading),
            output_label: clean_label(&output.heading),
            input_text: input.text.clone(),
            expected_output_text: output.text.clone(),
        })
        .collect();

    log::debug!(
        "Extracted problem_id={:?} contest_slug={:?} samples={}",
        problem_id,
        contest_slug,
        samples.len()
    );

    ProblemDescriptor {
        problem_id,
        title,
        contest_number,
        contest_slug,
        samples,
        unpaired_blocks,
    }
}

fn scrape_task_title(doc: &Html) -> Option<(String, String)> {
    let sel = util::selector_must_parsed("span.h2");
    let text = doc.select_first_opt(&sel)?.text_content();
    let caps = RE_TASK_TITLE.captures(text.trim())?;
    Some((caps[1].to_owned(), caps[2].trim().to_owned()))
}

fn scrape_contest_slug(doc: &Html) -> Option<String> {
    let sel = util::selector_must_parsed(r#"a[href^="/contests/"]"#);
    let href = doc.select_first_opt(&sel)?.value().attr("href")?;
    let caps = RE_CONTEST_PATH.captures(href)?;
    Some(caps[1].to_owned())
}

fn scrape_sections(doc: &Html) -> Vec<Section> {
    let sel_part = util::selector_must_parsed("div.part");
    let sel_h3 = util::selector_must_parsed("h3");
    let sel_pre = util::selector_must_parsed("pre");

    doc.select(&sel_part)
        .filter_map(|part: ElementRef| {
            let h3 = part.select_first_opt(&sel_h3)?;
            let pre = part.select_first_opt(&sel_pre)?;
            Some(Section {
                heading: h3.text_content(),
                text: pre.text_content(),
            })
        })
        .collect()
}

/// Splits sections into (inputs, outputs), each in document order.
fn classify_sections(sections: &[Section]) -> (Vec<&Section>, Vec<&Section>) {
    for markers in MARKERS {
        let mut inputs = Vec::with_capacity(5);
        let mut outputs = Vec::with_capacity(5);
        for section in sections {
            let heading = section.heading.to_lowercase();
            if heading.contains(markers.input) {
                inputs.push(section);
            } else if heading.contains(markers.output) {
                outputs.push(section);
            }
        }
        if !inputs.is_empty() || !outputs.is_empty() {
            return (inputs, outputs);
        }
    }
    (Vec::new(), Vec::new())
}

fn clean_label(heading: &str) -> String {
    heading.replace(DECORATIVE_TOKEN, "").trim().to_owned()
}
