// src/models/tree.rs

//! 爬取结果的内存模型：课程 → 章节 → {文件, 文件夹 → 文件}。
//!
//! 插入同名条目会原位替换旧条目，保持首次出现的位置，
//! 因此遍历顺序始终等于爬取时的发现顺序。

/// 一个可下载的叶子资源，由外部爬虫产生，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub display_name: String,
    pub prefix: String,
    pub source_url: String,
}

impl ResourceRef {
    pub fn new(
        display_name: impl Into<String>,
        prefix: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            prefix: prefix.into(),
            source_url: source_url.into(),
        }
    }

    /// 本地文件名的初始提议（尚未补全扩展名），格式为 `<prefix>. <name>`
    pub fn proposed_file_name(&self) -> String {
        format!("{}. {}", self.prefix, self.display_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Folder {
    pub name: String,
    pub files: Vec<ResourceRef>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn insert_file(&mut self, resource: ResourceRef) {
        upsert_resource(&mut self.files, resource);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub name: String,
    pub files: Vec<ResourceRef>,
    pub folders: Vec<Folder>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn insert_file(&mut self, resource: ResourceRef) {
        upsert_resource(&mut self.files, resource);
    }

    /// 返回指定名称的文件夹，不存在时在末尾创建。
    pub fn folder_mut(&mut self, name: &str) -> &mut Folder {
        let index = match self.folders.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => {
                self.folders.push(Folder::new(name));
                self.folders.len() - 1
            }
        };
        &mut self.folders[index]
    }

    pub fn resource_count(&self) -> usize {
        self.files.len() + self.folders.iter().map(|f| f.files.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub sections: Vec<Section>,
}

impl Course {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sections: Vec::new(),
        }
    }

    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn resource_count(&self) -> usize {
        self.sections.iter().map(Section::resource_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTree {
    pub courses: Vec<Course>,
}

impl ContentTree {
    pub fn insert_course(&mut self, course: Course) {
        match self.courses.iter_mut().find(|c| c.id == course.id) {
            Some(existing) => *existing = course,
            None => self.courses.push(course),
        }
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn resource_count(&self) -> usize {
        self.courses.iter().map(Course::resource_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

fn upsert_resource(files: &mut Vec<ResourceRef>, resource: ResourceRef) {
    match files
        .iter_mut()
        .find(|f| f.display_name == resource.display_name)
    {
        Some(existing) => *existing = resource,
        None => files.push(resource),
    }
}
