//! Drive the fetcher against a local stand-in for the efetch endpoint.

use std::time::Duration;

use citeref_pubmed::{FetchOptions, PubMedFetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn article(pmid: &str) -> String {
    format!(
        "<PubmedArticle><MedlineCitation><PMID>{pmid}</PMID>\
         <Article PubModel=\"Print\"><ArticleTitle>Title {pmid}</ArticleTitle></Article>\
         </MedlineCitation></PubmedArticle>"
    )
}

fn article_set(pmids: &[&str]) -> String {
    let body: String = pmids.iter().map(|p| article(p)).collect();
    format!("<?xml version=\"1.0\"?><PubmedArticleSet>{body}</PubmedArticleSet>")
}

/// Answer one connection per canned `(status, body)` pair, in order, and
/// return the request lines that were received.
async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/efetch.fcgi", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let head = String::from_utf8_lossy(&received);
            requests.push(head.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/xml\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        requests
    });

    (url, handle)
}

fn fetcher(url: String, chunk_size: usize, save_text: bool) -> PubMedFetcher {
    PubMedFetcher::new(FetchOptions {
        efetch_url: url,
        chunk_size,
        wait: Duration::from_millis(10),
        save_text,
    })
    .unwrap()
}

#[tokio::test]
async fn chunks_are_merged_by_pmid() {
    let (url, server) = serve(vec![
        (200, article_set(&["1", "2"])),
        (200, article_set(&["3"])),
    ])
    .await;

    let outcome = fetcher(url, 2, false)
        .fetch_list(&["1", "2", "2", "3"])
        .await;

    assert_eq!(outcome.chunks, 2);
    assert_eq!(outcome.failed_chunks, 0);
    assert_eq!(outcome.articles.keys().collect::<Vec<_>>(), ["1", "2", "3"]);
    assert_eq!(
        outcome.articles["3"].article.as_ref().unwrap().title.as_deref(),
        Some("Title 3")
    );
    assert!(outcome.raw_xml.is_empty());

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /efetch.fcgi?db=pubmed&retmode=xml&id=1%2C2 "));
    assert!(requests[1].contains("id=3 "));
}

#[tokio::test]
async fn error_bodies_and_http_failures_are_skipped() {
    let (url, server) = serve(vec![
        (200, "ERROR: too many requests".to_string()),
        (500, "oops".to_string()),
        (200, article_set(&["5"])),
    ])
    .await;

    let outcome = fetcher(url, 1, true).fetch_list(&["3", "4", "5"]).await;

    assert_eq!(outcome.chunks, 3);
    assert_eq!(outcome.failed_chunks, 2);
    assert_eq!(outcome.articles.keys().collect::<Vec<_>>(), ["5"]);
    assert_eq!(outcome.raw_xml, [article_set(&["5"])]);

    server.await.unwrap();
}

#[tokio::test]
async fn raw_xml_written_to_file() {
    let (url, server) = serve(vec![(200, article_set(&["8"]))]).await;

    let outcome = fetcher(url, 200, true).fetch_list(&["8"]).await;
    server.await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pubmed.xml");
    outcome.write_raw_xml(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("<PMID>8</PMID>"));
}

#[tokio::test]
async fn empty_id_list_makes_no_requests() {
    let outcome = fetcher("http://127.0.0.1:9/efetch.fcgi".into(), 200, false)
        .fetch_list::<&str>(&[])
        .await;
    assert_eq!(outcome.chunks, 0);
    assert!(outcome.articles.is_empty());
}
