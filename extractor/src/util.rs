use scraper::{ElementRef, Html, Selector};

pub fn selector_must_parsed(sel: &'static str) -> Selector {
    Selector::parse(sel).expect("Failed to parse  `&'static str`  selector")
}

pub trait DocExt {
    fn select_first_opt(&self, sel: &Selector) -> Option<ElementRef>;
}

impl DocExt for Html {
    fn select_first_opt(&self, sel: &Selector) -> Option<ElementRef> {
        self.select(sel).next()
    }
}

impl<'a> DocExt for ElementRef<'a> {
    fn select_first_opt(&self, sel: &Selector) -> Option<ElementRef> {
        self.select(sel).next()
    }
}

pub trait ElementRefExt {
    /// Concatenation of every descendant text node (like `innerText` without layout).
    fn text_content(&self) -> String;
}

impl<'a> ElementRefExt for ElementRef<'a> {
    fn text_content(&self) -> String {
        self.text().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn text_content_joins_nested_nodes() {
        let doc = Html::parse_fragment(r#"<h3>入力例 1<span class="btn">Copy</span></h3>"#);
        let sel = selector_must_parsed("h3");
        let h3 = doc.select_first_opt(&sel).unwrap();
        assert_eq!(h3.text_content(), "入力例 1Copy");
    }

    #[test]
    fn select_first_opt_none() {
        let doc = Html::parse_fragment("<div></div>");
        let sel = selector_must_parsed("pre");
        assert!(doc.select_first_opt(&sel).is_none());
    }
}
