use super::ExtractContext;
use crate::text::{collapse_whitespace, html_to_text};
use crate::timestamps::parse_display_time;
use crate::types::{AggregatorError, Result, StreamItem};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Where the pieces of a post live in one family of timeline pages.
struct MarkupProfile {
    name: &'static str,
    post: &'static str,
    body: &'static str,
    permalink: &'static str,
    permalink_attr: Option<&'static str>,
    id_attr: Option<&'static str>,
    time: &'static str,
    time_attr: &'static str,
    full_name: &'static str,
    username: &'static str,
}

const PROFILES: &[MarkupProfile] = &[
    // Classic twitter.com web timeline
    MarkupProfile {
        name: "twitter",
        post: "div.tweet",
        body: "p.tweet-text",
        permalink: "a.tweet-timestamp",
        permalink_attr: Some("data-permalink-path"),
        id_attr: Some("data-tweet-id"),
        time: "span._timestamp",
        time_attr: "data-time",
        full_name: "strong.fullname",
        username: "span.username",
    },
    // Nitter front-ends
    MarkupProfile {
        name: "nitter",
        post: "div.timeline-item",
        body: "div.tweet-content",
        permalink: "a.tweet-link",
        permalink_attr: None,
        id_attr: None,
        time: "span.tweet-date a",
        time_attr: "title",
        full_name: "a.fullname",
        username: "a.username",
    },
];

struct CompiledProfile {
    post: Selector,
    body: Selector,
    permalink: Selector,
    time: Selector,
    full_name: Selector,
    username: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AggregatorError::General(format!("bad selector '{}': {}", css, e)))
}

impl CompiledProfile {
    fn compile(profile: &MarkupProfile) -> Result<Self> {
        Ok(Self {
            post: selector(profile.post)?,
            body: selector(profile.body)?,
            permalink: selector(profile.permalink)?,
            time: selector(profile.time)?,
            full_name: selector(profile.full_name)?,
            username: selector(profile.username)?,
        })
    }
}

/// Extract posts from a timeline page.
///
/// The first markup profile that yields any usable post wins. A page where no
/// profile yields one is a parse error.
pub fn extract_posts(html: &str, context: &ExtractContext) -> Result<Vec<StreamItem>> {
    let document = Html::parse_document(html);

    for profile in PROFILES {
        let compiled = CompiledProfile::compile(profile)?;
        let posts: Vec<ElementRef> = document.select(&compiled.post).collect();
        if posts.is_empty() {
            continue;
        }

        let posts_len = posts.len();
        let items: Vec<StreamItem> = posts
            .into_iter()
            .filter_map(|post| post_to_item(post, profile, &compiled, context))
            .collect();
        if items.is_empty() {
            debug!(
                "Found {} {} posts on {} but none were usable",
                posts_len, profile.name, context.source_locator
            );
            continue;
        }
        debug!(
            "Recognized {} {} posts on {}",
            items.len(),
            profile.name,
            context.source_locator
        );
        return Ok(items);
    }

    Err(AggregatorError::Parse {
        locator: context.source_locator.clone(),
        message: "document is neither a feed nor a recognizable timeline".to_string(),
    })
}

fn post_to_item(
    post: ElementRef,
    profile: &MarkupProfile,
    compiled: &CompiledProfile,
    context: &ExtractContext,
) -> Option<StreamItem> {
    let body = post.select(&compiled.body).next()?;
    // Twitter appends an ellipsis to shortened links
    let text = html_to_text(&body.inner_html().replace('\u{2026}', ""));
    if text.is_empty() {
        return None;
    }

    let href = post
        .select(&compiled.permalink)
        .next()
        .and_then(|a| a.value().attr("href"))
        .or_else(|| profile.permalink_attr.and_then(|attr| post.value().attr(attr)));
    let link = href.and_then(|href| context.absolute_link(href));

    let identity = link
        .clone()
        .or_else(|| profile.id_attr.and_then(|attr| post.value().attr(attr)).map(str::to_string))?;

    let timestamp = post
        .select(&compiled.time)
        .next()
        .and_then(|el| {
            let raw = el
                .value()
                .attr(profile.time_attr)
                .map(str::to_string)
                .unwrap_or_else(|| el.text().collect());
            parse_display_time(&raw, context.fetched_at)
        })
        .unwrap_or(context.fetched_at);

    Some(StreamItem {
        identity,
        text,
        timestamp,
        source_locator: context.source_locator.clone(),
        source_name: author(post, compiled),
        link,
    })
}

fn author(post: ElementRef, compiled: &CompiledProfile) -> Option<String> {
    let text_of = |sel: &Selector| {
        post.select(sel)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    };
    let name = text_of(&compiled.full_name);
    let handle = text_of(&compiled.username).map(|h| h.trim_start_matches('@').to_string());

    match (name, handle) {
        (Some(name), Some(handle)) => Some(format!("{} (@{})", name, handle)),
        (None, Some(handle)) => Some(format!("@{}", handle)),
        (Some(name), None) => Some(name),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    const TWITTER: &str = r#"<html><body><ol id="stream-items-id">
<li class="stream-item"><div class="tweet js-stream-tweet" data-tweet-id="1001" data-permalink-path="/jack/status/1001">
  <div class="content">
    <div class="stream-item-header">
      <a class="account-group"><strong class="fullname">Jack</strong> <span class="username">@<b>jack</b></span></a>
      <small class="time"><a href="/jack/status/1001" class="tweet-timestamp"><span class="_timestamp" data-time="1430000000">Apr 25</span></a></small>
    </div>
    <p class="tweet-text">just setting up my <a href="/hashtag/twttr">#twttr</a> pic.twitter.com/abc…</p>
  </div>
</div></li>
<li class="stream-item"><div class="tweet js-stream-tweet" data-tweet-id="1000">
  <div class="content">
    <div class="stream-item-header"><strong class="fullname">Jack</strong> <span class="username">@<b>jack</b></span></div>
    <p class="tweet-text">older post without a timestamp link</p>
  </div>
</div></li>
</ol></body></html>"#;

    const NITTER: &str = r#"<html><body><div class="timeline">
<div class="timeline-item">
  <a class="tweet-link" href="/rustlang/status/7#m"></a>
  <div class="tweet-body">
    <div class="tweet-header">
      <a class="fullname" href="/rustlang">Rust Language</a>
      <a class="username" href="/rustlang">@rustlang</a>
      <span class="tweet-date"><a href="/rustlang/status/7#m" title="Oct 3, 2026 · 10:15 PM UTC">Oct 3</a></span>
    </div>
    <div class="tweet-content media-body">Rust <b>1.99</b> is out</div>
  </div>
</div>
<div class="timeline-item">
  <a class="tweet-link" href="/rustlang/status/8#m"></a>
  <div class="tweet-body">
    <span class="tweet-date"><a href="/rustlang/status/8#m">2h</a></span>
    <div class="tweet-content media-body">Second post</div>
  </div>
</div>
<div class="timeline-item"><div class="tweet-content">orphan without permalink</div></div>
</div></body></html>"#;

    fn context(locator: &str) -> ExtractContext {
        ExtractContext::new(locator, locator, Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap())
    }

    #[test]
    fn twitter_markup() {
        let items = extract_posts(TWITTER, &context("https://twitter.com/jack")).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].identity, "https://twitter.com/jack/status/1001");
        assert_eq!(items[0].text, "just setting up my #twttr pic.twitter.com/abc");
        assert_eq!(items[0].timestamp, Utc.timestamp_opt(1_430_000_000, 0).unwrap());
        assert_eq!(items[0].source_name.as_deref(), Some("Jack (@jack)"));

        // falls back to the post id and the fetch time
        assert_eq!(items[1].identity, "1000");
        assert_eq!(items[1].timestamp, Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap());
    }

    #[test]
    fn nitter_markup() {
        let ctx = context("https://nitter.example/rustlang");
        let items = extract_posts(NITTER, &ctx).unwrap();

        // the orphan has neither permalink nor id and is skipped
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].identity, "https://nitter.example/rustlang/status/7");
        assert_eq!(items[0].text, "Rust 1.99 is out");
        assert_eq!(items[0].timestamp, Utc.with_ymd_and_hms(2026, 10, 3, 22, 15, 0).unwrap());
        assert_eq!(items[0].source_name.as_deref(), Some("Rust Language (@rustlang)"));
        assert_eq!(items[1].timestamp, ctx.fetched_at - Duration::hours(2));
        assert_eq!(items[1].source_name, None);
    }

    #[test]
    fn posts_without_identity_are_a_parse_error() {
        let html = r#"<html><body>
<div class="timeline-item"><div class="tweet-content">first orphan</div></div>
<div class="timeline-item"><div class="tweet-content">second orphan</div></div>
</body></html>"#;
        let err = extract_posts(html, &context("https://nitter.example/someone")).unwrap_err();
        assert!(matches!(err, AggregatorError::Parse { .. }));
    }

    #[test]
    fn unrecognized_page_is_a_parse_error() {
        let err = extract_posts("<html><body><p>hello</p></body></html>", &context("https://x.example"))
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Parse { .. }));
    }
}
