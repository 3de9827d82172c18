use chrono::{Duration as ChronoDuration, Utc};
use mockito::Matcher;
use newswire::auth::TokenAuthority;
use newswire::cache::ResponseCache;
use newswire::cli::{news_session, Prompter};
use newswire::error::{AuthError, SearchError};
use newswire::news::{ArticleFetcher, ResultSource, SearchContext, SearchQuery};
use newswire::rate_limit::RateLimiter;
use std::io::Cursor;
use std::time::Duration;

const PATH: &str = "/v2/everything";
const SECRET: &str = "pipeline-secret";

const ONE_ARTICLE: &str = r#"{
    "status": "ok",
    "articles": [{
        "source": {"id": "bbc-news", "name": "BBC News"},
        "title": "Economy grows",
        "description": "Growth beat forecasts.",
        "url": "https://www.bbc.co.uk/news/1",
        "publishedAt": "2024-01-15T10:30:00Z"
    }]
}"#;

fn context(server: &mockito::Server, max_requests: usize) -> SearchContext {
    let fetcher = ArticleFetcher::new(
        format!("{}{}", server.url(), PATH),
        "test-key",
        "bbc.co.uk",
        "en",
        Duration::from_secs(5),
    )
    .expect("build fetcher");

    SearchContext::new(
        TokenAuthority::new(SECRET, 24),
        RateLimiter::new(max_requests, 60),
        ResponseCache::new(300),
        fetcher,
    )
}

async fn mock_articles(server: &mut mockito::Server, body: &str, hits: usize) -> mockito::Mock {
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn economy_january() -> SearchQuery {
    SearchQuery::parse("economy", "01-01-2024", "31-01-2024").unwrap()
}

#[tokio::test]
async fn test_cached_query_skips_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_articles(&mut server, ONE_ARTICLE, 1).await;

    let mut ctx = context(&server, 10);
    let token = ctx.tokens().issue("alice").unwrap();
    let query = economy_january();

    let first = ctx.search(&token, &query).await.expect("first search");
    assert_eq!(first.source, ResultSource::Remote);
    assert_eq!(first.remaining, 9);

    let second = ctx.search(&token, &query).await.expect("second search");
    assert_eq!(second.source, ResultSource::Cache);
    assert_eq!(second.articles, first.articles);
    assert_eq!(second.remaining, 8);

    // Only the first search reached the API.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_token_consumes_no_quota() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_articles(&mut server, ONE_ARTICLE, 1).await;

    let mut ctx = context(&server, 1);
    let query = economy_january();

    let invalid = ctx.search("garbage", &query).await.unwrap_err();
    assert!(matches!(invalid, SearchError::Unauthorized(AuthError::Invalid)));

    let expired_token = ctx
        .tokens()
        .issue_expiring_at("alice", Utc::now() - ChronoDuration::hours(1))
        .unwrap();
    let expired = ctx.search(&expired_token, &query).await.unwrap_err();
    assert!(matches!(expired, SearchError::Unauthorized(AuthError::Expired)));

    // The single slot in alice's window is still free.
    let token = ctx.tokens().issue("alice").unwrap();
    let outcome = ctx.search(&token, &query).await.expect("valid search");
    assert_eq!(outcome.articles.len(), 1);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_rate_limit_applies_before_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_articles(&mut server, ONE_ARTICLE, 1).await;

    let mut ctx = context(&server, 2);
    let token = ctx.tokens().issue("bob").unwrap();
    let query = economy_january();

    ctx.search(&token, &query).await.expect("first");
    ctx.search(&token, &query).await.expect("second, from cache");

    match ctx.search(&token, &query).await {
        Err(SearchError::RateLimited { retry_after }) => {
            assert!(retry_after > Duration::ZERO);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    // Another user has an independent window.
    let other = ctx.tokens().issue("carol").unwrap();
    let outcome = ctx.search(&other, &query).await.expect("carol search");
    assert_eq!(outcome.source, ResultSource::Cache);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_results_are_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_articles(&mut server, r#"{"status": "ok", "articles": []}"#, 2).await;

    let mut ctx = context(&server, 10);
    let token = ctx.tokens().issue("dave").unwrap();
    let query = SearchQuery::parse("nothing-matches", "", "").unwrap();

    for _ in 0..2 {
        let outcome = ctx.search(&token, &query).await.expect("search");
        assert!(outcome.articles.is_empty());
        assert_eq!(outcome.source, ResultSource::Remote);
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_errors_are_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .expect(2)
        .create_async()
        .await;

    let mut ctx = context(&server, 10);
    let token = ctx.tokens().issue("erin").unwrap();
    let query = economy_january();

    for _ in 0..2 {
        let err = ctx.search(&token, &query).await.unwrap_err();
        assert!(matches!(err, SearchError::RemoteRateLimited));
    }

    failing.assert_async().await;
}

#[tokio::test]
async fn test_interactive_session_reports_cache_and_bad_dates() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_articles(&mut server, ONE_ARTICLE, 1).await;

    let mut ctx = context(&server, 10);
    let input = [
        "alice",
        // bad date: reported, then the search prompts start over
        "economy",
        "2024-01-01",
        "",
        "economy",
        "01-01-2024",
        "31-01-2024",
        "y",
        "Economy",
        "01-01-2024",
        "31-01-2024",
        "n",
    ]
    .join("\n")
        + "\n";

    let mut prompt = Prompter::new(Cursor::new(input), Vec::new());
    news_session(&mut ctx, &mut prompt).await.expect("session");

    let (_, out) = prompt.into_inner();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("Login successful! Token: "));
    assert!(out.contains("Invalid from date: '2024-01-01'. Use DD-MM-YYYY format"));
    assert!(out.contains("API call successful. 9 requests remaining this minute."));
    assert!(out.contains("Data served from cache"));
    assert_eq!(out.matches("Found 1 articles:").count(), 2);
    assert!(out.contains("Published   : 15 Jan 2024, 10:30 AM"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_interactive_session_reports_search_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let mut ctx = context(&server, 10);
    let input = "\n\n\n\nn\n";
    let mut prompt = Prompter::new(Cursor::new(input), Vec::new());
    news_session(&mut ctx, &mut prompt).await.expect("session");

    let (_, out) = prompt.into_inner();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Error: invalid API key"));
    assert!(out.contains("No articles found for your query."));
}
