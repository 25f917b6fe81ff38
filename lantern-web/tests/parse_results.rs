use lantern_web::parse_results;

fn organic(title: &str, dest: &str, body: &str) -> String {
    format!(
        r#"<div class="dd algo algo-sr Sr">
             <div class="compTitle"><h3 class="title"><a aria-label="{title}" href="https://r.search.yahoo.com/_ylt=x/RV=2/RE=1/RO=10/RU={dest}/RK=2/RS=y-">{title}</a></h3></div>
             <div class="compText aAbs"><p>  {body}  </p></div>
           </div>"#
    )
}

fn page(featured: bool, organic_count: usize) -> String {
    let mut html = String::from("<html><body><div id=\"left\">");
    html.push_str(r#"<div class="algo-sr ads"><h3 class="title"><a aria-label="Buy now" href="https://ads.example/">Buy</a></h3></div>"#);
    for i in 0..organic_count {
        html.push_str(&organic(
            &format!("Result {i}"),
            &format!("https%3a%2f%2fsite{i}.example%2fpage"),
            &format!("Snippet {i}"),
        ));
    }
    html.push_str("</div>");
    if featured {
        html.push_str(
            r#"<div id="right"><div class="searchRightTop">
                 <div class="compText"><a href="https://r.search.yahoo.com/RU=https%3a%2f%2fen.wikipedia.org%2fwiki%2fRust/RK=0">Rust (language)</a>
                 <p> A systems programming language. </p></div>
                 <ul class="compInfo"><li> Designed by: Graydon Hoare </li><li>First appeared: 2015 </li></ul>
               </div></div>"#,
        );
    }
    html.push_str("</body></html>");
    html
}

#[test]
fn featured_panel_comes_first_and_is_not_counted() {
    let results = parse_results(&page(true, 5), 3);
    assert_eq!(results.len(), 4);

    let featured = &results[0];
    assert_eq!(featured.title, "Rust (language)");
    assert_eq!(featured.url, "https://en.wikipedia.org/wiki/Rust");
    assert!(featured.body.starts_with("Rust (language)"));
    assert!(featured.body.contains("A systems programming language."));
    assert!(featured.body.ends_with("\n\nDesigned by: Graydon Hoare\nFirst appeared: 2015"));

    let organic: Vec<(&str, &str, &str)> = results[1..]
        .iter()
        .map(|r| (r.title.as_str(), r.body.as_str(), r.url.as_str()))
        .collect();
    assert_eq!(
        organic,
        vec![
            ("Result 0", "Snippet 0", "https://site0.example/page"),
            ("Result 1", "Snippet 1", "https://site1.example/page"),
            ("Result 2", "Snippet 2", "https://site2.example/page"),
        ]
    );
}

#[test]
fn count_above_available_returns_everything() {
    let results = parse_results(&page(false, 2), 10);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Result 0");
}

#[test]
fn no_panel_and_no_organic_blocks_is_empty() {
    assert!(parse_results(&page(false, 0), 3).is_empty());
    assert!(parse_results("", 3).is_empty());
}

#[test]
fn zero_count_keeps_only_the_panel() {
    let results = parse_results(&page(true, 4), 0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Rust (language)");
}
