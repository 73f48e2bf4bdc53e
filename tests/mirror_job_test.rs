// tests/mirror_job_test.rs

use async_trait::async_trait;
use mockito::{Matcher, Mock, ServerGuard};
use moodle_dl::config::{AppConfig, DownloaderKind, Secrets};
use moodle_dl::error::AppResult;
use moodle_dl::extractor::{ContentExtractor, Crawl};
use moodle_dl::models::{ContentTree, Course, ResourceRef, SessionToken};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// 直接返回预先构造好的内容树
struct FixedExtractor(Crawl);

#[async_trait]
impl ContentExtractor for FixedExtractor {
    async fn extract(&self, _config: &AppConfig, _secrets: &Secrets) -> AppResult<Crawl> {
        Ok(self.0.clone())
    }
}

fn secrets() -> Secrets {
    Secrets {
        moodle_username: "student".into(),
        moodle_password: "secret".into(),
    }
}

fn config(root: &Path, downloader: DownloaderKind) -> AppConfig {
    AppConfig {
        course_ids: vec!["123".into()],
        downloader,
        output_dir: root.join("downloads"),
        manifest_path: root.join("aria2c_input.txt"),
        ..AppConfig::default()
    }
}

/// 课程 123 "Algorithms"，章节 "1. Lectures"：
/// 直接文件 Slides，以及文件夹 Lab 下的 Sheet
fn algorithms_tree(server_url: &str) -> Crawl {
    let mut course = Course::new("123", "Algorithms");
    let section = course.section_mut("1. Lectures");
    section.insert_file(ResourceRef::new(
        "Slides",
        "1",
        format!("{}/view.php?id=1", server_url),
    ));
    section.folder_mut("Lab").insert_file(ResourceRef::new(
        "Sheet",
        "2",
        format!("{}/view.php?id=2", server_url),
    ));
    let mut tree = ContentTree::default();
    tree.insert_course(course);
    Crawl {
        session: SessionToken::new("tok123"),
        tree,
    }
}

async fn mock_redirect(server: &mut ServerGuard, id: &str, target: &str, hits: usize) -> Mock {
    server
        .mock("GET", "/view.php")
        .match_query(Matcher::UrlEncoded("id".into(), id.into()))
        .match_header("cookie", "MoodleSession=tok123")
        .with_status(302)
        .with_header("Location", target)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_file(server: &mut ServerGuard, path: &str, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found.sort();
    found
}

#[tokio::test(flavor = "multi_thread")]
async fn test_internal_mode_writes_files_and_skips_on_rerun() {
    let mut server = mockito::Server::new_async().await;
    // 第一次运行：每个资源一次探测加一次下载；第二次运行不应产生任何请求
    let slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf?ts=1", 2).await;
    let slides = mock_file(&mut server, "/plugin.php/slides.pdf", "%PDF-slides", 2).await;
    let sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 2).await;
    let sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 2).await;

    let tmp = TempDir::new().unwrap();
    let crawl = algorithms_tree(&server.url());
    let extractor = FixedExtractor(crawl);

    let stats = moodle_dl::run(config(tmp.path(), DownloaderKind::Internal), &secrets(), &extractor)
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.skipped, 0);

    let section_dir = tmp.path().join("downloads/Algorithms/1. Lectures");
    assert_eq!(
        fs::read_to_string(section_dir.join("1. Slides.pdf")).unwrap(),
        "%PDF-slides"
    );
    assert_eq!(
        fs::read_to_string(section_dir.join("Lab/2. Sheet.txt")).unwrap(),
        "exercise"
    );
    assert!(!tmp.path().join("aria2c_input.txt").exists());

    let stats = moodle_dl::run(config(tmp.path(), DownloaderKind::Internal), &secrets(), &extractor)
        .await
        .unwrap();
    assert_eq!(stats.downloaded, 0);
    assert_eq!(stats.skipped, 2);

    slides_view.assert_async().await;
    slides.assert_async().await;
    sheet_view.assert_async().await;
    sheet.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_manifest_mode_writes_blocks_and_no_files() {
    let mut server = mockito::Server::new_async().await;
    // 两次运行，每次只探测，不下载
    let slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf?ts=1", 2).await;
    let slides = mock_file(&mut server, "/plugin.php/slides.pdf", "%PDF", 2).await;
    let sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 2).await;
    let sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 2).await;

    let tmp = TempDir::new().unwrap();
    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let manifest_path = tmp.path().join("aria2c_input.txt");

    for _ in 0..2 {
        let stats = moodle_dl::run(
            config(tmp.path(), DownloaderKind::ExternalManifest),
            &secrets(),
            &extractor,
        )
        .await
        .unwrap();
        assert_eq!(stats.manifested, 2);
        assert_eq!(stats.downloaded, 0);

        let manifest = fs::read_to_string(&manifest_path).unwrap();
        assert_eq!(manifest.matches("header=Cookie:MoodleSession=tok123").count(), 2);
        assert!(manifest.contains("out=1. Slides.pdf"));
        assert!(manifest.contains("out=2. Sheet.txt"));
    }

    let downloads = dunce::canonicalize(tmp.path().join("downloads")).unwrap();
    let manifest = fs::read_to_string(&manifest_path).unwrap();
    let expected_first_block = format!(
        "{}/view.php?id=1\n  header=Cookie:MoodleSession=tok123\n  dir={}\n  out=1. Slides.pdf\n\n",
        server.url(),
        downloads.join("Algorithms").join("1. Lectures").display()
    );
    assert!(manifest.starts_with(&expected_first_block));
    assert!(files_under(&downloads).is_empty());

    slides_view.assert_async().await;
    slides.assert_async().await;
    sheet_view.assert_async().await;
    sheet.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_manifest_mode_skips_files_already_on_disk() {
    let mut server = mockito::Server::new_async().await;
    let slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf", 0).await;
    let sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 1).await;
    let _sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 1).await;

    let tmp = TempDir::new().unwrap();
    let section_dir = tmp.path().join("downloads/Algorithms/1. Lectures");
    fs::create_dir_all(&section_dir).unwrap();
    fs::write(section_dir.join("1. Slides.pdf"), "old").unwrap();

    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let stats = moodle_dl::run(
        config(tmp.path(), DownloaderKind::ExternalManifest),
        &secrets(),
        &extractor,
    )
    .await
    .unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.manifested, 1);
    let manifest = fs::read_to_string(tmp.path().join("aria2c_input.txt")).unwrap();
    assert!(!manifest.contains("Slides"));
    slides_view.assert_async().await;
    sheet_view.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_transfer_leaves_no_file_and_run_continues() {
    let mut server = mockito::Server::new_async().await;
    let _slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf", 2).await;
    // 探测成功，下载时服务器出错
    let _slides = mock_file(&mut server, "/plugin.php/slides.pdf", "%PDF", 1).await;
    let broken = server
        .mock("GET", "/plugin.php/slides.pdf")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let _sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 2).await;
    let _sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 2).await;

    let tmp = TempDir::new().unwrap();
    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let stats = moodle_dl::run(config(tmp.path(), DownloaderKind::Internal), &secrets(), &extractor)
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.downloaded, 1);
    let downloads = tmp.path().join("downloads");
    let written: Vec<_> = files_under(&downloads)
        .into_iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(written, ["2. Sheet.txt"]);
    broken.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unresolvable_resource_is_skipped_without_aborting() {
    let mut server = mockito::Server::new_async().await;
    let slides_view = server
        .mock("GET", "/view.php")
        .match_query(Matcher::UrlEncoded("id".into(), "1".into()))
        .with_status(500)
        .expect(3)
        .create_async()
        .await;
    let _sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 2).await;
    let _sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 2).await;

    let tmp = TempDir::new().unwrap();
    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let stats = moodle_dl::run(config(tmp.path(), DownloaderKind::Internal), &secrets(), &extractor)
        .await
        .unwrap();

    assert_eq!(stats.unresolved, 1);
    assert_eq!(stats.downloaded, 1);
    assert!(
        tmp.path()
            .join("downloads/Algorithms/1. Lectures/Lab/2. Sheet.txt")
            .is_file()
    );
    slides_view.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_transfer_is_not_cut_by_request_timeout() {
    let mut server = mockito::Server::new_async().await;
    let _slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf", 2).await;
    // 6 块，每块间隔 400ms：总时长远超 1s，但单次读取间隔不超过 1s
    let slides = server
        .mock("GET", "/plugin.php/slides.pdf")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            for i in 0..6 {
                w.write_all(format!("chunk{}\n", i).as_bytes())?;
                w.flush()?;
                thread::sleep(Duration::from_millis(400));
            }
            Ok(())
        })
        .expect(2)
        .create_async()
        .await;
    let _sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 2).await;
    let _sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 2).await;

    let tmp = TempDir::new().unwrap();
    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let config = AppConfig {
        timeout: Duration::from_secs(1),
        ..config(tmp.path(), DownloaderKind::Internal)
    };
    let stats = moodle_dl::run(config, &secrets(), &extractor).await.unwrap();

    assert_eq!(stats.failed, 0);
    assert_eq!(stats.downloaded, 2);
    let expected: String = (0..6).map(|i| format!("chunk{}\n", i)).collect();
    assert_eq!(
        fs::read_to_string(tmp.path().join("downloads/Algorithms/1. Lectures/1. Slides.pdf"))
            .unwrap(),
        expected
    );
    slides.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_resolution_keeps_traversal_order() {
    let mut server = mockito::Server::new_async().await;
    let _a_view = mock_redirect(&mut server, "1", "/plugin.php/a.pdf", 1).await;
    // 第一个资源响应最慢，后面的资源会先解析完成
    let _a = server
        .mock("GET", "/plugin.php/a.pdf")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body_from_request(|_| {
            thread::sleep(Duration::from_millis(500));
            b"%PDF".to_vec()
        })
        .expect(1)
        .create_async()
        .await;
    let _b_view = mock_redirect(&mut server, "2", "/plugin.php/b.txt", 1).await;
    let _b = mock_file(&mut server, "/plugin.php/b.txt", "b", 1).await;
    let _c_view = mock_redirect(&mut server, "3", "/plugin.php/c.zip", 1).await;
    let _c = mock_file(&mut server, "/plugin.php/c.zip", "c", 1).await;

    let mut course = Course::new("123", "Algorithms");
    let section = course.section_mut("1. Lectures");
    for (i, name) in ["Alpha", "Beta", "Gamma"].into_iter().enumerate() {
        let id = i + 1;
        section.insert_file(ResourceRef::new(
            name,
            id.to_string(),
            format!("{}/view.php?id={}", server.url(), id),
        ));
    }
    let mut tree = ContentTree::default();
    tree.insert_course(course);
    let extractor = FixedExtractor(Crawl {
        session: SessionToken::new("tok123"),
        tree,
    });

    let tmp = TempDir::new().unwrap();
    let config = AppConfig {
        probe_concurrency: 3,
        ..config(tmp.path(), DownloaderKind::ExternalManifest)
    };
    let stats = moodle_dl::run(config, &secrets(), &extractor).await.unwrap();
    assert_eq!(stats.manifested, 3);

    let manifest = fs::read_to_string(tmp.path().join("aria2c_input.txt")).unwrap();
    let outs: Vec<_> = manifest
        .lines()
        .filter_map(|l| l.trim_start().strip_prefix("out="))
        .collect();
    assert_eq!(outs, ["1. Alpha.pdf", "2. Beta.txt", "3. Gamma.zip"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_manifest_without_dedupe_lists_files_already_on_disk() {
    let mut server = mockito::Server::new_async().await;
    let slides_view = mock_redirect(&mut server, "1", "/plugin.php/slides.pdf", 1).await;
    let _slides = mock_file(&mut server, "/plugin.php/slides.pdf", "%PDF", 1).await;
    let sheet_view = mock_redirect(&mut server, "2", "/plugin.php/sheet.txt", 1).await;
    let _sheet = mock_file(&mut server, "/plugin.php/sheet.txt", "exercise", 1).await;

    let tmp = TempDir::new().unwrap();
    let section_dir = tmp.path().join("downloads/Algorithms/1. Lectures");
    fs::create_dir_all(&section_dir).unwrap();
    fs::write(section_dir.join("1. Slides.pdf"), "old").unwrap();

    let extractor = FixedExtractor(algorithms_tree(&server.url()));
    let config = AppConfig {
        dedupe_manifest: false,
        ..config(tmp.path(), DownloaderKind::ExternalManifest)
    };
    let stats = moodle_dl::run(config, &secrets(), &extractor).await.unwrap();

    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.manifested, 2);
    let manifest = fs::read_to_string(tmp.path().join("aria2c_input.txt")).unwrap();
    assert!(manifest.contains("  out=1. Slides.pdf\n"));
    assert!(manifest.contains("  out=2. Sheet.txt\n"));
    // 清单模式不会改动已有文件
    assert_eq!(fs::read_to_string(section_dir.join("1. Slides.pdf")).unwrap(), "old");
    slides_view.assert_async().await;
    sheet_view.assert_async().await;
}
