mod common;

use common::{candidate, ScriptedProbe, ScriptedSearch};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use suggestion_resolver::dedupe::dedupe;
use suggestion_resolver::resolver::search_query;
use suggestion_resolver::{
    Availability, Category, HintLevel, MarkerPreference, MockLlmAdapter, PriorItem, RawSuggestion,
    ResolutionPath, ResolutionSettings, ResolutionStrategy, Resolver, ResolverError, Result,
    SourceError, SuggestionRequest, Theme,
};
use tracing::info;

const THREE_SONGS: &str = r#"Here you go!
[
  {"title": "Take On Me", "source": "Hunting High and Low", "artist": "a-ha", "link": "https://www.youtube.com/watch?v=djV11Xbc914"},
  {"title": "Never Gonna Give You Up", "source": "Whenever You Need Somebody", "artist": "Rick Astley", "link": "https://youtu.be/dQw4w9WgXcQ"},
  {"title": "Tainted Love", "source": "Non-Stop Erotic Cabaret", "artist": "Soft Cell", "link": ""}
]"#;

fn request(category: Category, count: usize) -> Result<SuggestionRequest> {
    Ok(SuggestionRequest::new(category, Theme::new("80s hits")?, count)?)
}

fn build(
    reply: &str,
    search: Arc<ScriptedSearch>,
    probe: Arc<ScriptedProbe>,
    settings: ResolutionSettings,
) -> (Resolver, Arc<MockLlmAdapter>) {
    let source = Arc::new(MockLlmAdapter::new("resolver-test".to_string()).with_reply(reply));
    let resolver = Resolver::new(source.clone(), search, probe, settings);
    (resolver, source)
}

#[tokio::test]
async fn test_three_songs_end_to_end() -> Result<()> {
    common::init_tracing();

    let search = Arc::new(ScriptedSearch::new().answer(
        "tainted love",
        vec![
            candidate("aaaaaaaaaaa", "Tainted Love (cover)", "Pub Band", Some(200)),
            candidate("ZcyCQLswYi8", "Soft Cell - Tainted Love (Official Video)", "SoftCellVEVO", Some(160)),
        ],
    ));
    let probe = Arc::new(ScriptedProbe::new());
    let (resolver, _) = build(THREE_SONGS, search.clone(), probe.clone(), ResolutionSettings::default());

    let resolution = resolver.resolve(&request(Category::Song, 3)?).await?;
    let items = resolution.result_set.items();
    info!("Resolved {} items", items.len());

    let titles: Vec<&str> = items.iter().map(|i| i.display_title.as_str()).collect();
    assert_eq!(titles, vec!["Take On Me", "Never Gonna Give You Up", "Tainted Love"]);

    let media: Vec<&str> = items
        .iter()
        .map(|i| i.media.as_ref().map(|m| m.as_str()).unwrap_or(""))
        .collect();
    assert_eq!(media, vec!["djV11Xbc914", "dQw4w9WgXcQ", "ZcyCQLswYi8"]);

    let paths: Vec<ResolutionPath> = items.iter().map(|i| i.resolution).collect();
    assert_eq!(
        paths,
        vec![ResolutionPath::EmbeddedLink, ResolutionPath::EmbeddedLink, ResolutionPath::Search]
    );
    assert!(items.iter().all(|i| i.available == Availability::Confirmed));

    // One search, for the only item without a link, with the ranking floor applied
    let queries = search.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, "Tainted Love Soft Cell official");
    assert!(queries[0].1 >= 5);

    let report = &resolution.report;
    assert_eq!((report.requested, report.resolved), (3, 3));
    assert_eq!((report.via_link, report.via_search), (2, 1));
    assert!(!report.is_partial());
    assert!(!report.needs_warning());

    assert_eq!(resolution.result_set.cursor(), 0);
    assert!(!resolution.result_set.is_revealed());
    Ok(())
}

#[tokio::test]
async fn test_prose_reply_is_malformed_response() -> Result<()> {
    common::init_tracing();

    let search = Arc::new(ScriptedSearch::new());
    let (resolver, _) = build(
        "I'd love to help! Some great 80s songs include Take On Me and Africa.",
        search.clone(),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let result = resolver.resolve(&request(Category::Song, 3)?).await;
    match result {
        Err(ResolverError::Source(SourceError::MalformedResponse(_))) => {}
        other => panic!("expected malformed response, got {:?}", other.map(|r| r.report)),
    }
    assert!(search.queries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_is_recoverable() -> Result<()> {
    common::init_tracing();

    let source = Arc::new(MockLlmAdapter::new("down".to_string()).with_failure("connection reset"));
    let resolver = Resolver::new(
        source,
        Arc::new(ScriptedSearch::new()),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let error = resolver
        .resolve(&request(Category::Song, 3)?)
        .await
        .expect_err("source is down");
    assert!(matches!(error, ResolverError::Source(SourceError::Transport(_))));
    assert!(error.is_recoverable());
    Ok(())
}

#[tokio::test]
async fn test_partial_resolution_is_reported_not_raised() -> Result<()> {
    common::init_tracing();

    let reply = r#"[
        {"title": "Take On Me", "artist": "a-ha", "link": "https://www.youtube.com/watch?v=djV11Xbc914"},
        {"title": "Obscure B-Side", "artist": "Nobody"},
        {"title": "Lost Demo", "artist": "Nobody"},
        {"title": "Unreleased Jam", "artist": "Nobody"}
    ]"#;
    let (resolver, _) = build(
        reply,
        Arc::new(ScriptedSearch::new()),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let resolution = resolver.resolve(&request(Category::Song, 4)?).await?;
    assert_eq!(resolution.result_set.len(), 1);
    let report = &resolution.report;
    assert_eq!(report.unresolved, vec!["Obscure B-Side", "Lost Demo", "Unreleased Jam"]);
    assert!(report.is_partial());
    assert!(report.needs_warning());
    Ok(())
}

#[tokio::test]
async fn test_search_failure_only_affects_that_item() -> Result<()> {
    common::init_tracing();

    let (resolver, _) = build(
        THREE_SONGS,
        Arc::new(ScriptedSearch::failing()),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let resolution = resolver.resolve(&request(Category::Song, 3)?).await?;
    assert_eq!(resolution.result_set.len(), 2);
    assert_eq!(resolution.report.unresolved, vec!["Tainted Love"]);
    assert!(!resolution.report.needs_warning());
    Ok(())
}

#[tokio::test]
async fn test_exclusions_reach_the_prompt_and_filter_the_reply() -> Result<()> {
    common::init_tracing();

    let (resolver, source) = build(
        THREE_SONGS,
        Arc::new(ScriptedSearch::new().answer("tainted love", vec![candidate("ZcyCQLswYi8", "Tainted Love", "Soft Cell - Topic", None)])),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let request = request(Category::Song, 3)?
        .with_exclusions(vec![PriorItem::new("never gonna give you up", "rick astley")]);
    let resolution = resolver.resolve(&request).await?;

    let prompts = source.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.starts_with("Suggest 3 songs related to: 80s hits"));
    assert!(prompts[0]
        .user
        .contains("Please avoid these songs: never gonna give you up by rick astley"));
    assert!(prompts[0].system.contains("Return exactly 3 songs"));

    // The model repeated an excluded song anyway; it is not offered again
    let titles: Vec<&str> = resolution
        .result_set
        .items()
        .iter()
        .map(|i| i.display_title.as_str())
        .collect();
    assert_eq!(titles, vec!["Take On Me", "Tainted Love"]);
    Ok(())
}

#[tokio::test]
async fn test_quotes_are_display_only() -> Result<()> {
    common::init_tracing();

    let reply = r#"```json
[
  {"quote": "Here's looking at you, kid.", "source": "Casablanca", "speaker": "Rick Blaine", "year": 1942},
  {"quote": "May the Force be with you.", "source": "Star Wars", "speaker": "Han Solo"}
]
```"#;
    let search = Arc::new(ScriptedSearch::new());
    let probe = Arc::new(ScriptedProbe::new());
    let (resolver, _) = build(reply, search.clone(), probe.clone(), ResolutionSettings::default());

    let resolution = resolver.resolve(&request(Category::Quote, 2)?).await?;
    let items = resolution.result_set.items();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.media.is_none() && i.resolution == ResolutionPath::TextOnly));
    assert_eq!(items[0].display_meta.contributor, "Rick Blaine");
    assert_eq!(items[0].display_meta.year, "1942");
    assert_eq!(items[1].display_meta.year, "Unknown");
    assert!(search.queries().is_empty());
    assert!(probe.probed().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_movie_scenes_carry_staged_hints() -> Result<()> {
    common::init_tracing();

    let reply = r#"[
      {"title": "Hyperspace jump", "movie": "Star Wars", "character": "Han Solo", "year": "1977", "genre": "Sci-Fi",
       "description": "Han Solo pushes the Millennium Falcon into hyperspace.",
       "anonymized_description": "A smuggler pushes his ship to impossible speed."},
      {"title": "Here's Johnny", "movie": "The Shining", "character": "Jack Torrance", "year": "1980", "genre": "Horror",
       "description": "Jack Torrance breaks through the bathroom door."}
    ]"#;
    let search = Arc::new(
        ScriptedSearch::new()
            .answer("hyperspace", vec![candidate("aBcDeFgHiJk", "Hyperspace scene", "Movieclips", Some(120))])
            .answer("johnny", vec![candidate("kLmNoPqRsTu", "Here's Johnny", "Movieclips", Some(90))]),
    );
    let (resolver, _) = build(reply, search.clone(), Arc::new(ScriptedProbe::new()), ResolutionSettings::default());

    let mut result_set = resolver.resolve(&request(Category::MovieScene, 2)?).await?.result_set;
    assert_eq!(search.queries()[0].0, "Star Wars Hyperspace jump scene");

    assert_eq!(result_set.hint_level(), Some(HintLevel::Anonymized));
    assert_eq!(
        result_set.current_hint_text().as_deref(),
        Some("A smuggler pushes his ship to impossible speed.")
    );
    result_set.advance_hint();
    result_set.advance_hint();
    assert_eq!(
        result_set.current_hint_text().as_deref(),
        Some("Han Solo pushes the Millennium Falcon into hyperspace. (1977, Sci-Fi)")
    );

    // Second scene has no anonymized text, so it starts one level up
    result_set.next();
    assert_eq!(result_set.hint_level(), Some(HintLevel::NamesRevealed));
    Ok(())
}

#[tokio::test]
async fn test_movie_scenes_without_clips_skip_search() -> Result<()> {
    common::init_tracing();

    let reply = r#"[{"title": "Hyperspace jump", "movie": "Star Wars", "character": "Han Solo"}]"#;
    let search = Arc::new(ScriptedSearch::new());
    let settings = ResolutionSettings {
        movie_scene_clips: false,
        ..ResolutionSettings::default()
    };
    let (resolver, _) = build(reply, search.clone(), Arc::new(ScriptedProbe::new()), settings);

    let resolution = resolver.resolve(&request(Category::MovieScene, 1)?).await?;
    assert_eq!(resolution.result_set.items()[0].resolution, ResolutionPath::TextOnly);
    assert!(search.queries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_search_only_ignores_embedded_links() -> Result<()> {
    common::init_tracing();

    let search = Arc::new(
        ScriptedSearch::new()
            .answer("take on me", vec![candidate("s6VaeFCxta8", "Take On Me", "a-ha - Topic", Some(226))])
            .answer("never gonna", vec![candidate("yPYZpwSpKmA", "Never Gonna Give You Up", "Rick Astley", Some(213))])
            .answer("tainted love", vec![candidate("ZcyCQLswYi8", "Tainted Love", "Soft Cell - Topic", Some(160))]),
    );
    let settings = ResolutionSettings {
        strategy: ResolutionStrategy::SearchOnly,
        ..ResolutionSettings::default()
    };
    let (resolver, _) = build(THREE_SONGS, search.clone(), Arc::new(ScriptedProbe::new()), settings);

    let resolution = resolver.resolve(&request(Category::Song, 3)?).await?;
    assert_eq!(search.queries().len(), 3);
    assert!(resolution
        .result_set
        .items()
        .iter()
        .all(|i| i.resolution == ResolutionPath::Search));
    assert_eq!(resolution.result_set.items()[0].media.as_ref().map(|m| m.as_str()), Some("s6VaeFCxta8"));
    Ok(())
}

#[tokio::test]
async fn test_unavailable_link_falls_through_to_search() -> Result<()> {
    common::init_tracing();

    let raw = RawSuggestion {
        title: Some("Take On Me".to_string()),
        contributor: Some("a-ha".to_string()),
        link: Some("https://www.youtube.com/watch?v=djV11Xbc914".to_string()),
        ..RawSuggestion::default()
    };
    let search = Arc::new(ScriptedSearch::new().answer(
        "take on me",
        vec![
            candidate("s6VaeFCxta8", "Take On Me", "a-ha - Topic", Some(226)),
            candidate("11111111111", "Take On Me (Official Video)", "a-ha Official", Some(244)),
        ],
    ));
    let probe = Arc::new(
        ScriptedProbe::new()
            .unavailable("djV11Xbc914")
            .unavailable("11111111111")
            .titled("s6VaeFCxta8", "Take On Me (2017 Remaster)"),
    );
    let (resolver, _) = build(THREE_SONGS, search, probe.clone(), ResolutionSettings::default());

    let media = resolver
        .resolve_media(&raw, Category::Song)
        .await
        .expect("search finds a replacement");
    assert_eq!(media.video.as_str(), "s6VaeFCxta8");
    assert_eq!(media.path, ResolutionPath::Search);
    assert_eq!(media.availability, Availability::Confirmed);
    assert_eq!(media.canonical_title.as_deref(), Some("Take On Me (2017 Remaster)"));
    // Link first, then candidates best-first until one passes
    assert_eq!(probe.probed(), vec!["djV11Xbc914", "11111111111", "s6VaeFCxta8"]);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_link_kept_when_search_finds_nothing() -> Result<()> {
    common::init_tracing();

    let raw = RawSuggestion {
        title: Some("Take On Me".to_string()),
        contributor: Some("a-ha".to_string()),
        link: Some("https://youtu.be/djV11Xbc914".to_string()),
        ..RawSuggestion::default()
    };
    let probe = Arc::new(ScriptedProbe::new().unavailable("djV11Xbc914"));
    let (resolver, _) = build(THREE_SONGS, Arc::new(ScriptedSearch::new()), probe, ResolutionSettings::default());

    let media = resolver.resolve_media(&raw, Category::Song).await.expect("link is kept");
    assert_eq!(media.availability, Availability::ConfirmedUnavailable);
    assert_eq!(media.path, ResolutionPath::EmbeddedLink);
    Ok(())
}

#[tokio::test]
async fn test_unconfirmed_top_candidate_beats_nothing() -> Result<()> {
    common::init_tracing();

    let raw = RawSuggestion {
        title: Some("Tainted Love".to_string()),
        contributor: Some("Soft Cell".to_string()),
        ..RawSuggestion::default()
    };
    let search = Arc::new(ScriptedSearch::new().answer(
        "tainted love",
        vec![
            candidate("aaaaaaaaaaa", "Tainted Love karaoke", "Sing Along", Some(160)),
            candidate("ZcyCQLswYi8", "Tainted Love", "Soft Cell - Topic", Some(160)),
        ],
    ));
    let probe = Arc::new(ScriptedProbe::new().unavailable("aaaaaaaaaaa").unavailable("ZcyCQLswYi8"));
    let (resolver, _) = build(THREE_SONGS, search, probe, ResolutionSettings::default());

    let media = resolver.resolve_media(&raw, Category::Song).await.expect("best guess");
    assert_eq!(media.video.as_str(), "ZcyCQLswYi8");
    assert_eq!(media.availability, Availability::Unconfirmed);
    Ok(())
}

#[tokio::test]
async fn test_canonical_title_overrides_display_title() -> Result<()> {
    common::init_tracing();

    let probe = Arc::new(ScriptedProbe::new().titled("djV11Xbc914", "a-ha - Take On Me (Official Video)"));
    let (resolver, _) = build(
        THREE_SONGS,
        Arc::new(ScriptedSearch::new()),
        probe,
        ResolutionSettings::default(),
    );

    let resolution = resolver.resolve(&request(Category::Song, 3)?).await?;
    let first = &resolution.result_set.items()[0];
    assert_eq!(first.display_title, "a-ha - Take On Me (Official Video)");
    assert_eq!(first.display_meta.suggested_title, "Take On Me");
    assert_eq!(first.prior_item(), PriorItem::new("Take On Me", "a-ha"));
    Ok(())
}

#[tokio::test]
async fn test_batch_dedupes_shared_media() -> Result<()> {
    common::init_tracing();

    let reply = r#"[
        {"title": "Take On Me", "artist": "a-ha", "link": "https://www.youtube.com/watch?v=djV11Xbc914"},
        {"title": "Take On Me (MTV version)", "artist": "a-ha", "link": "https://youtu.be/djV11Xbc914"},
        {"title": "Never Gonna Give You Up", "artist": "Rick Astley", "link": "https://youtu.be/dQw4w9WgXcQ"}
    ]"#;
    let (resolver, _) = build(
        reply,
        Arc::new(ScriptedSearch::new()),
        Arc::new(ScriptedProbe::new()),
        ResolutionSettings::default(),
    );

    let resolution = resolver.resolve(&request(Category::Song, 3)?).await?;
    assert_eq!(resolution.report.duplicates_dropped, 1);
    let items = resolution.result_set.items().to_vec();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].display_title, "Take On Me");

    assert_eq!(dedupe(items.clone()), items);
    Ok(())
}

#[test]
fn test_search_query_shapes() {
    common::init_tracing();

    let song = RawSuggestion {
        title: Some("Take On Me".to_string()),
        contributor: Some("a-ha".to_string()),
        ..RawSuggestion::default()
    };
    assert_eq!(
        search_query(&song, Category::Song, MarkerPreference::PreferOriginal),
        "Take On Me a-ha official"
    );
    assert_eq!(
        search_query(&song, Category::Song, MarkerPreference::PreferKaraoke),
        "Take On Me a-ha karaoke"
    );

    let anonymous = RawSuggestion {
        title: Some("Greensleeves".to_string()),
        contributor: Some("Unknown".to_string()),
        ..RawSuggestion::default()
    };
    assert_eq!(
        search_query(&anonymous, Category::Song, MarkerPreference::PreferOriginal),
        "Greensleeves official"
    );
}
