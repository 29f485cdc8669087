//! Slot table loading.
//!
//! The slot table is row oriented. Each row names a slot by its marker, the
//! prompt used to ask for it, and a matcher cell that is either a regex or a
//! `|`-separated value set. Rows may also declare prerequisite slots and
//! keyword groups mapping surface words to canonical values:
//!
//! ```toml
//! [[slot]]
//! slot = "#劳动问题类型#"
//! query = "具体是什么劳动问题？"
//! values = "工资|加班|辞退"
//! requires = ["#法律类型#"]
//!
//! [[slot.keyword]]
//! canonical = "termination"
//! triggers = ["辞退", "解雇", "开除"]
//! ```

use crate::lexicon::DomainKeywords;
use crate::ConfigError;
use serde::Deserialize;
use slotwise_core::{KeywordGroup, LegalDomain, SlotDefinition, SlotKey, SlotMatcher};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    slot: Vec<SlotRow>,
}

#[derive(Debug, Deserialize)]
struct SlotRow {
    slot: String,
    query: String,
    values: String,
    #[serde(default)]
    requires: Option<Vec<String>>,
    #[serde(default)]
    keyword: Vec<KeywordGroup>,
}

/// Slot definitions keyed by slot, plus any prerequisite overrides the table declared.
#[derive(Debug, Clone)]
pub struct SlotTable {
    definitions: BTreeMap<SlotKey, SlotDefinition>,
    requires: HashMap<SlotKey, Vec<SlotKey>>,
}

impl SlotTable {
    /// Parse a slot table. Rows with unknown markers are skipped; a row
    /// whose matcher fails to compile keeps its prompt but never matches.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: TableFile = toml::from_str(content).map_err(|e| ConfigError::InvalidTable {
            table: "slot table".into(),
            reason: e.to_string(),
        })?;
        if file.slot.is_empty() {
            return Err(ConfigError::InvalidTable {
                table: "slot table".into(),
                reason: "no [[slot]] rows".into(),
            });
        }

        let mut table = Self {
            definitions: BTreeMap::new(),
            requires: HashMap::new(),
        };
        for row in file.slot {
            let Some(key) = SlotKey::from_marker(&row.slot) else {
                tracing::warn!("Slot table: skipping unknown slot {}", row.slot);
                continue;
            };
            if let Some(requires) = row.requires {
                let deps = requires
                    .iter()
                    .filter_map(|r| {
                        let dep = SlotKey::from_marker(r);
                        if dep.is_none() {
                            tracing::warn!("Slot table: {} requires unknown slot {r}", row.slot);
                        }
                        dep
                    })
                    .collect();
                table.requires.insert(key, deps);
            }
            let definition = SlotDefinition::new(key, row.query, compile_matcher(key, &row.values))
                .with_keywords(row.keyword);
            table.definitions.insert(key, definition);
        }
        table.fill_missing();
        Ok(table)
    }

    /// Load a slot table file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let table = Self::from_toml(&content)?;
        tracing::info!(
            "Loaded slot table ({} slots) from {}",
            table.definitions.len(),
            path.display()
        );
        Ok(table)
    }

    /// Load `path` if given, falling back to the built-in table on any failure.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("{e}; using built-in slot table");
                Self::builtin()
            }),
            None => Self::builtin(),
        }
    }

    /// The built-in table covering every slot key.
    pub fn builtin() -> Self {
        let keywords = DomainKeywords::builtin();
        let definitions = SlotKey::ALL
            .into_iter()
            .map(|key| {
                let (prompt, values) = builtin_row(key);
                let def = SlotDefinition::new(key, prompt, compile_matcher(key, values))
                    .with_keywords(builtin_keywords(key, &keywords));
                (key, def)
            })
            .collect();
        Self {
            definitions,
            requires: HashMap::new(),
        }
    }

    /// Add built-in rows for any slot the loaded table did not define.
    fn fill_missing(&mut self) {
        let builtin = Self::builtin();
        let mut fixed = Vec::new();
        for (key, def) in builtin.definitions {
            if !self.definitions.contains_key(&key) {
                self.definitions.insert(key, def);
                fixed.push(key.marker());
            }
        }
        if !fixed.is_empty() {
            tracing::info!("Slot table: using built-in rows for {}", fixed.join(", "));
        }
    }

    pub fn get(&self, key: SlotKey) -> Option<&SlotDefinition> {
        self.definitions.get(&key)
    }

    /// Prompt text for `key`, or a generic request naming the slot.
    pub fn prompt(&self, key: SlotKey) -> String {
        self.definitions
            .get(&key)
            .map(|d| d.prompt.clone())
            .unwrap_or_else(|| format!("请提供您的{}信息。", key.marker().trim_matches('#')))
    }

    /// Prerequisites declared by the table, overriding the built-in graph.
    pub fn declared_requires(&self) -> &HashMap<SlotKey, Vec<SlotKey>> {
        &self.requires
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Slots whose matcher failed to compile.
    pub fn unmatched(&self) -> Vec<SlotKey> {
        self.definitions
            .values()
            .filter(|d| d.matcher.is_none())
            .map(|d| d.key)
            .collect()
    }
}

fn compile_matcher(key: SlotKey, raw: &str) -> Option<SlotMatcher> {
    match SlotMatcher::parse(raw) {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            tracing::warn!("Slot {}: skipping malformed pattern: {e}", key.marker());
            None
        }
    }
}

fn builtin_row(key: SlotKey) -> (&'static str, &'static str) {
    match key {
        SlotKey::LegalDomain => (
            "您想咨询哪方面的法律问题？",
            "劳动|婚姻|交通|房产|知识产权|刑事|行政|合同|辞退|解雇|开除|离婚|交通事故|房产纠纷|工资|加班|合同解除|工伤|社保|继承|家暴|产权|拆迁|装修",
        ),
        SlotKey::LaborIssue => (
            "具体是什么劳动问题？",
            "工资|加班|合同解除|试用期|社保|工伤|辞退|解雇|开除|离职|拖欠工资|未签合同|非法解除|经济补偿|赔偿金|竞业限制|年假|病假|调岗|降薪|年终奖|提成|加班费|双倍工资|社保补缴|公积金|劳动仲裁|劳动合同|转正",
        ),
        SlotKey::Employer => (
            "您的用人单位名称是？",
            r"[一-龥]+有限公司|[一-龥]+公司|[一-龥]+企业|[一-龥]+集团|[A-Za-z]+(?:\s[A-Za-z]+)*\s?(?:Inc\.|Ltd\.|Company|Corporation|Group)",
        ),
        SlotKey::WorkDuration => (
            "您在该单位工作了多长时间？",
            "[1-9][0-9]*年|[1-9][0-9]*个月|几个月|几年|一年多|两年多|不到一年|三年以上|五年以上|十年以上|一个月|两个月|三个月|半年|一年|两年|三年|四年|五年|十年|三十年",
        ),
        SlotKey::MarriageIssue => (
            "具体是什么婚姻家庭问题？",
            "离婚|财产分割|子女抚养|继承|家暴|分居|重婚|遗弃|虐待|赡养|抚养费|赡养费|探视权|婚姻无效|撤销婚姻|彩礼|嫁妆|婚前财产|婚后财产|共同财产|个人财产|遗嘱|法定继承|代位继承|转继承",
        ),
        SlotKey::MarriageDuration => (
            "您结婚多长时间了？",
            "[1-9][0-9]*年|几个月|几年|一年多|两年多|不到一年|三年以上|五年以上|十年以上|一个月|两个月|三个月|半年|一年|两年|三年|四年|五年|十年|三十年",
        ),
        SlotKey::AccidentType => (
            "具体是什么类型的交通事故？",
            "追尾事故|碰撞事故|刮擦事故|伤人事故|死亡事故|车祸|碰撞|追尾|刮擦|伤人|死亡|碾压|侧翻|翻车|撞人|撞车|撞墙|撞树|酒驾|醉驾|超速|闯红灯|逆行|无证驾驶|疲劳驾驶|肇事逃逸",
        ),
        SlotKey::LiableParty => (
            "事故责任方是谁？",
            "对方|我方|他方|机动车|非机动车|行人|司机|车主|乘客",
        ),
        SlotKey::PropertyIssue => (
            "具体是什么房产问题？",
            "买卖|租赁|产权|拆迁|装修|抵押|过户|继承|赠与|分割|违约|退房|逾期|质量|物业费|停车费|中介费|定金|首付|贷款|产权证|房产证|土地证|不动产证|学区房|商品房|二手房|经济适用房|保障房|公租房|廉租房|小产权房|农村自建房|别墅|公寓|商铺|写字楼",
        ),
        SlotKey::PropertyLocation => (
            "房屋位于哪个城市？",
            "北京|上海|广州|深圳|杭州|成都|重庆|武汉|西安|苏州|天津|南京|长沙|郑州|东莞|青岛|沈阳|宁波|昆明|合肥|福州|厦门|济南|哈尔滨|长春|大连|石家庄|太原|南昌|贵阳|南宁|兰州|银川|西宁|乌鲁木齐|呼和浩特|拉萨|海口|三亚",
        ),
        SlotKey::IpType => (
            "具体是什么知识产权问题？",
            "专利|商标|著作权|版权|域名|商业秘密|不正当竞争|专利申请|商标注册|版权登记|侵权|维权",
        ),
        SlotKey::CriminalCharge => (
            "具体是什么刑事罪名？",
            "盗窃|故意伤害|诈骗|抢劫|强奸|贪污|受贿|职务侵占|交通肇事|危险驾驶|妨害公务|聚众斗殴|寻衅滋事|敲诈勒索|非法拘禁|绑架|故意杀人|过失致人死亡|放火|爆炸|投放危险物质",
        ),
        SlotKey::AdministrativeCase => (
            "具体是什么行政案件？",
            "行政诉讼|行政复议|行政处罚|行政许可|政府信息公开|行政强制|行政征收|行政给付|行政确认|行政裁决|行政协议|行政指导|行政调解|行政不作为",
        ),
        SlotKey::ContractType => (
            "具体是什么类型的合同？",
            "买卖合同|租赁合同|借款合同|劳动合同|服务合同|建设工程合同|委托合同|保管合同|运输合同|技术合同|赠与合同|融资租赁合同|承揽合同|行纪合同|居间合同|保理合同|物业服务合同|合伙合同",
        ),
        SlotKey::ContractSubject => (
            "合同的标的是什么？",
            "房屋|车辆|货物|设备|借款|款项|服务|软件|工程|土地|股权|商品",
        ),
    }
}

fn builtin_keywords(key: SlotKey, domains: &DomainKeywords) -> Vec<KeywordGroup> {
    match key {
        SlotKey::LegalDomain => domains
            .iter()
            .map(|(domain, words)| {
                let mut triggers: Vec<String> = words.to_vec();
                triggers.extend(domain_extras(domain).iter().map(|w| w.to_string()));
                KeywordGroup {
                    canonical: domain.as_str().to_string(),
                    triggers,
                }
            })
            .collect(),
        SlotKey::LaborIssue => vec![
            KeywordGroup::new(
                "termination",
                &["辞退", "解雇", "开除", "离职", "炒鱿鱼", "裁员", "非法解除", "解除合同", "合同解除"],
            ),
            KeywordGroup::new(
                "wages",
                &["工资", "薪酬", "薪水", "薪资", "报酬", "拖欠", "克扣", "拖欠工资", "降薪", "年终奖", "提成", "双倍工资"],
            ),
            KeywordGroup::new(
                "overtime",
                &["加班", "加班费", "超时", "夜班", "周末加班", "法定节假日加班"],
            ),
            KeywordGroup::new(
                "contract",
                &["合同", "劳动合同", "协议", "签订", "续签", "变更", "未签合同", "试用期", "转正"],
            ),
            KeywordGroup::new(
                "social_insurance",
                &["社保", "社会保险", "五险一金", "公积金", "缴纳", "补缴", "社保补缴"],
            ),
            KeywordGroup::new(
                "work_injury",
                &["工伤", "工伤赔偿", "工伤认定", "伤残", "受伤", "索赔", "腿断", "骨折", "伤残鉴定"],
            ),
        ],
        SlotKey::MarriageIssue => vec![
            KeywordGroup::new("divorce", &["离婚", "想离婚", "分居", "婚姻无效", "撤销婚姻"]),
            KeywordGroup::new(
                "property_division",
                &["财产分割", "婚前财产", "婚后财产", "共同财产", "个人财产", "彩礼", "嫁妆"],
            ),
            KeywordGroup::new("custody", &["子女抚养", "抚养费", "抚养权", "探视权"]),
            KeywordGroup::new(
                "inheritance",
                &["继承", "遗嘱", "法定继承", "代位继承", "转继承"],
            ),
            KeywordGroup::new("domestic_violence", &["家暴", "虐待", "遗弃"]),
            KeywordGroup::new("support", &["赡养", "赡养费"]),
        ],
        _ => Vec::new(),
    }
}

/// Surface forms in the domain slot's value set that the keyword table lacks.
fn domain_extras(domain: LegalDomain) -> &'static [&'static str] {
    match domain {
        LegalDomain::Labor => &["合同解除"],
        LegalDomain::Traffic => &["交通事故"],
        LegalDomain::RealEstate => &["房产纠纷"],
        _ => &[],
    }
}
