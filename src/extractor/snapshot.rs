// src/extractor/snapshot.rs

use super::{ContentExtractor, Crawl};
use crate::{
    config::{AppConfig, Secrets},
    error::*,
    models::{ContentTree, Course, ResourceRef, Section, SessionToken},
};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use std::{fmt, fs, marker::PhantomData, path::PathBuf};

/// 按文档中的出现顺序保存 JSON 对象的键值对。
#[derive(Debug)]
struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    #[serde(default)]
    session_cookie: Option<String>,
    #[serde(default)]
    contents: OrderedMap<CourseEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CourseEntry {
    course_name: String,
    #[serde(default)]
    sections: OrderedMap<SectionEntry>,
}

#[derive(Deserialize, Debug)]
struct SectionEntry {
    #[serde(default)]
    files: OrderedMap<ResourceEntry>,
    #[serde(default)]
    folders: OrderedMap<OrderedMap<ResourceEntry>>,
    #[serde(default)]
    restricted: Vec<RestrictedEntry>,
}

#[derive(Deserialize, Debug)]
struct ResourceEntry {
    prefix: String,
    url: String,
}

#[derive(Deserialize, Debug)]
struct RestrictedEntry {
    name: String,
    #[serde(default)]
    reason: Option<String>,
}

/// 读取外部爬虫导出的内容快照 (JSON)。
pub struct SnapshotExtractor {
    path: PathBuf,
}

impl SnapshotExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, text: &str, course_ids: &[String]) -> AppResult<Crawl> {
        let snapshot: SnapshotFile = serde_json::from_str(text).map_err(|e| {
            AppError::Config(format!("内容快照 '{}' 格式不正确: {}", self.path.display(), e))
        })?;

        let session = SessionToken::new(snapshot.session_cookie.unwrap_or_default());
        if session.is_empty() {
            return Err(AppError::Auth(format!(
                "内容快照 '{}' 中没有有效的会话 Cookie (sessionCookie)，请重新登录并导出",
                self.path.display()
            )));
        }

        let mut courses = snapshot.contents.0;
        let mut tree = ContentTree::default();
        for id in course_ids {
            match courses.iter().position(|(key, _)| key == id) {
                Some(index) => {
                    let (id, entry) = courses.remove(index);
                    tree.insert_course(build_course(id, entry));
                }
                None => warn!("内容快照中没有课程 {}，已跳过。", id),
            }
        }
        for (id, _) in &courses {
            debug!("课程 {} 不在配置的课程列表中，忽略。", id);
        }
        Ok(Crawl { session, tree })
    }
}

fn build_course(id: String, entry: CourseEntry) -> Course {
    let mut course = Course::new(id, entry.course_name);
    for (section_name, section_entry) in entry.sections.0 {
        let section = course.section_mut(&section_name);
        fill_section(section, section_entry);
    }
    course
}

fn fill_section(section: &mut Section, entry: SectionEntry) {
    for restricted in &entry.restricted {
        warn!(
            "      └─ 资源不可访问 \"{}\"，原因: \"{}\"",
            restricted.name,
            restricted.reason.as_deref().unwrap_or("未知")
        );
    }
    for (name, resource) in entry.files.0 {
        debug!("      └─ 发现资源 \"{}\"", name);
        section.insert_file(ResourceRef::new(name, resource.prefix, resource.url));
    }
    for (folder_name, files) in entry.folders.0 {
        let folder = section.folder_mut(&folder_name);
        for (name, resource) in files.0 {
            debug!("      └─ 发现资源 \"{}/{}\"", folder_name, name);
            folder.insert_file(ResourceRef::new(name, resource.prefix, resource.url));
        }
    }
}

#[async_trait]
impl ContentExtractor for SnapshotExtractor {
    async fn extract(&self, config: &AppConfig, secrets: &Secrets) -> AppResult<Crawl> {
        info!(
            "读取用户 '{}' 的内容快照: '{}'",
            secrets.moodle_username,
            self.path.display()
        );
        let text = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Config(format!(
                "无法读取内容快照 '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        let crawl = self.parse(&text, &config.course_ids)?;
        if crawl.tree.is_empty() {
            warn!("内容快照中没有任何已配置的课程。");
        }
        info!(
            "共 {} 门课程，{} 个可下载资源",
            crawl.tree.courses.len(),
            crawl.tree.resource_count()
        );
        Ok(crawl)
    }
}
