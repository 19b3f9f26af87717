//! Harvest a headline list out of a news-like page. The template survives
//! the extra wrapper divs the markup carries around each story.

use harvester::{Anchor, Harvester, HtmlDocument, Options};

const PAGE: &str = r#"
<html>
<body>
  <main>
    <section id="top-stories">
      <div class="story-wrap">
        <article>
          <h2><a href="/story/rust-2026">Rust keeps growing</a></h2>
          <div class="byline">
            <span class="author">A. Writer</span>
            <time>2026-08-06</time>
          </div>
          <p>Another year, another edition.</p>
        </article>
      </div>
    </section>
  </main>
</body>
</html>"#;

const TPL: &str = "
article
  h2
    a{title}[link=href]
  div
    span{author}
    time{date}";

fn main() {
    let doc = HtmlDocument::parse(PAGE);
    let harvester = Harvester::with_options(Options::default());
    let ret = harvester.harvest(&doc, TPL, Some(Anchor::Selector("#top-stories")));

    println!(
        "matched {}/{} ({:.0}%)",
        ret.found_score,
        ret.max_score,
        100.0 * ret.found_score as f64 / ret.max_score as f64
    );
    let mut pairs: Vec<_> = ret.map.iter().collect();
    pairs.sort();
    for (key, value) in pairs {
        println!("{key:>8}: {value}");
    }
    for diagnostic in &ret.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
}
