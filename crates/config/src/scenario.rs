//! Scenario graph loading.
//!
//! Scenario files are JSON arrays of node records:
//!
//! ```json
//! [{"id": "node2", "intent": ["我被公司辞退了"], "slot": ["#劳动问题类型#"],
//!   "childnode": [], "action": ["LABOR_CONSULTATION"]}]
//! ```
//!
//! Node ids and child references are namespaced by the file stem
//! (`scenario-legal.json` → `scenario-legal_node2`) so several files can be
//! loaded side by side. Unknown slot markers are dropped with a warning.

use crate::ConfigError;
use serde::Deserialize;
use slotwise_core::{DomainAction, DomainNode, LegalDomain, NodeId, SlotKey};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// Name used for the embedded scenario.
pub const BUILTIN_SCENARIO: &str = "legal";

#[derive(Debug, Deserialize)]
struct NodeRecord {
    id: String,
    #[serde(default, alias = "intents")]
    intent: Vec<String>,
    #[serde(default, alias = "slots")]
    slot: Vec<String>,
    #[serde(default, alias = "children")]
    childnode: Vec<String>,
    #[serde(default)]
    action: Vec<String>,
}

/// Immutable, loaded scenario graph.
#[derive(Debug, Clone)]
pub struct ScenarioGraph {
    name: String,
    nodes: Vec<DomainNode>,
    index: HashMap<NodeId, usize>,
    depths: HashMap<NodeId, usize>,
}

impl ScenarioGraph {
    /// Build a graph from nodes whose ids are already namespaced.
    pub fn from_nodes(name: impl Into<String>, nodes: Vec<DomainNode>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let mut graph = Self {
            name: name.into(),
            nodes,
            index,
            depths: HashMap::new(),
        };
        graph.depths = graph.compute_depths();
        graph
    }

    /// Parse a scenario file's contents. `name` is the namespace prefix.
    pub fn from_json(name: &str, json: &str) -> Result<Self, ConfigError> {
        let records: Vec<NodeRecord> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidTable {
                table: format!("scenario '{name}'"),
                reason: e.to_string(),
            })?;
        if records.is_empty() {
            return Err(ConfigError::InvalidTable {
                table: format!("scenario '{name}'"),
                reason: "no nodes".into(),
            });
        }

        let mut nodes = Vec::with_capacity(records.len());
        for record in records {
            let slots = record
                .slot
                .iter()
                .filter_map(|raw| {
                    let key = SlotKey::from_marker(raw);
                    if key.is_none() {
                        tracing::warn!("Scenario {name}: node {} has unknown slot {raw}", record.id);
                    }
                    key
                })
                .collect();

            let action = match record.action.first() {
                Some(tag) => tag.parse::<DomainAction>().map_err(|reason| {
                    ConfigError::InvalidTable {
                        table: format!("scenario '{name}' node {}", record.id),
                        reason,
                    }
                })?,
                None => DomainAction::default(),
            };

            nodes.push(DomainNode {
                id: NodeId::namespaced(name, &record.id),
                intents: record.intent,
                slots,
                children: record
                    .childnode
                    .iter()
                    .map(|c| NodeId::namespaced(name, c))
                    .collect(),
                action,
            });
        }

        let graph = Self::from_nodes(name, nodes);
        for node in &graph.nodes {
            for child in &node.children {
                if !graph.index.contains_key(child) {
                    tracing::warn!("Scenario {name}: {} links to missing node {child}", node.id);
                }
            }
        }
        Ok(graph)
    }

    /// Load a scenario file. The namespace is the file stem.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(BUILTIN_SCENARIO);
        let graph = Self::from_json(name, &content)?;
        tracing::info!(
            "Loaded scenario {} ({} nodes) from {}",
            graph.name,
            graph.nodes.len(),
            path.display()
        );
        Ok(graph)
    }

    /// Load `path` if given, falling back to the built-in scenario on any failure.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("{e}; using built-in scenario");
                Self::builtin()
            }),
            None => Self::builtin(),
        }
    }

    /// The embedded legal-consultation scenario: one entry node plus one
    /// node per domain and a catch-all for unsupported legal areas.
    pub fn builtin() -> Self {
        let id = |n: &str| NodeId::namespaced(BUILTIN_SCENARIO, n);
        let phrases = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut nodes = Vec::new();
        let mut children = Vec::new();
        for (i, domain) in LegalDomain::ALL.into_iter().enumerate() {
            let node_id = id(&format!("node{}", i + 2));
            children.push(node_id.clone());
            nodes.push(DomainNode {
                id: node_id,
                intents: phrases(builtin_intents(domain)),
                slots: domain.slots().to_vec(),
                children: vec![],
                action: DomainAction::for_domain(domain),
            });
        }
        let other = id("node10");
        children.push(other.clone());
        nodes.push(DomainNode {
            id: other,
            intents: phrases(&["公司股权纠纷", "海商海事问题", "证券金融纠纷", "环境污染索赔"]),
            slots: vec![],
            children: vec![],
            action: DomainAction::OtherLegalConsultation,
        });

        let root = DomainNode {
            id: id("node1"),
            intents: phrases(&["我想咨询法律问题", "我有一个法律问题", "请问律师", "法律咨询"]),
            slots: vec![SlotKey::LegalDomain],
            children,
            action: DomainAction::LegalConsultation,
        };
        nodes.insert(0, root);
        Self::from_nodes(BUILTIN_SCENARIO, nodes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DomainNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&DomainNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes nobody links to.
    pub fn roots(&self) -> Vec<&DomainNode> {
        let linked: HashSet<&NodeId> = self.nodes.iter().flat_map(|n| &n.children).collect();
        self.nodes.iter().filter(|n| !linked.contains(&n.id)).collect()
    }

    /// Nodes reachable from the roots, in load order.
    pub fn reachable(&self) -> Vec<&DomainNode> {
        self.nodes
            .iter()
            .filter(|n| self.depths.contains_key(&n.id))
            .collect()
    }

    /// Distance from the nearest root.
    pub fn depth(&self, id: &NodeId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    /// The first node whose action names `domain`.
    pub fn node_for_domain(&self, domain: LegalDomain) -> Option<&DomainNode> {
        self.nodes.iter().find(|n| n.domain() == Some(domain))
    }

    /// Narrow a domain-less node to its child for `domain`, falling back to
    /// any node for that domain.
    pub fn refine(&self, id: &NodeId, domain: LegalDomain) -> Option<&DomainNode> {
        self.node(id)
            .and_then(|parent| {
                parent
                    .children
                    .iter()
                    .filter_map(|c| self.node(c))
                    .find(|c| c.domain() == Some(domain))
            })
            .or_else(|| self.node_for_domain(domain))
    }

    /// All example phrases, for building a lexical scorer's corpus.
    pub fn intent_phrases(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .flat_map(|n| n.intents.iter().map(String::as_str))
    }

    fn compute_depths(&self) -> HashMap<NodeId, usize> {
        let mut depths = HashMap::new();
        let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::new();

        let roots = self.roots();
        if roots.is_empty() {
            // Fully cyclic graph: treat every node as a root.
            queue.extend(self.nodes.iter().map(|n| (&n.id, 0)));
        } else {
            queue.extend(roots.into_iter().map(|n| (&n.id, 0)));
        }

        while let Some((id, depth)) = queue.pop_front() {
            if depths.contains_key(id) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            depths.insert(id.clone(), depth);
            for child in &node.children {
                queue.push_back((child, depth + 1));
            }
        }
        depths
    }
}

fn builtin_intents(domain: LegalDomain) -> &'static [&'static str] {
    match domain {
        LegalDomain::Labor => &[
            "我被公司辞退了",
            "公司拖欠工资",
            "加班没有加班费",
            "劳动合同纠纷",
            "工伤赔偿怎么算",
            "公司不给交社保",
        ],
        LegalDomain::Marriage => &[
            "我想离婚",
            "离婚财产怎么分割",
            "孩子抚养权归谁",
            "遗产继承纠纷",
            "遭受家暴怎么办",
        ],
        LegalDomain::Traffic => &[
            "发生了交通事故",
            "出车祸了怎么赔偿",
            "被车撞了",
            "追尾事故责任认定",
            "肇事逃逸怎么处理",
        ],
        LegalDomain::RealEstate => &[
            "买房合同纠纷",
            "租房押金不退",
            "房屋拆迁补偿",
            "房产证办理问题",
            "开发商延期交房",
        ],
        LegalDomain::IntellectualProperty => &[
            "商标被侵权",
            "专利申请流程",
            "著作权侵权怎么办",
            "作品被抄袭",
        ],
        LegalDomain::Criminal => &[
            "我被人打了",
            "家里被盗窃了",
            "遇到诈骗怎么办",
            "被抢劫了",
            "刑事案件辩护",
        ],
        LegalDomain::Administrative => &[
            "对行政处罚不服",
            "申请行政复议",
            "起诉政府部门",
            "行政诉讼怎么打",
        ],
        LegalDomain::Contract => &[
            "对方违约怎么办",
            "借款合同纠纷",
            "买卖合同不履行",
            "租赁合同解除",
        ],
    }
}
