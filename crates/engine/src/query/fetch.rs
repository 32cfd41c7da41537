//! FetchXML parsing
//!
//! Parses FetchXML text into a [`QueryExpression`] so it shares the object
//! form's normalization path. Supported elements: `fetch`, `entity`,
//! `attribute`, `all-attributes`, `order`, `filter`, `condition`, `value`
//! and arbitrarily nested `link-entity`. Anything else is rejected.
//!
//! Link attributes follow the platform convention: `from` names the
//! attribute on the linked entity and `to` the attribute on its parent.

use memcrm_core::schema::primary_id_for;
use memcrm_core::{CrmError, CrmResult, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::expression::{
    AttributeExpression, ColumnSet, Condition, ConditionOperator, FilterNode, LinkEntity,
    LogicalOperator, OrderExpression, OrderType, PagingInfo, QueryExpression,
};
use super::spec::{AggregateFn, DateGrouping, JoinOperator};

/// Parse FetchXML into a query expression.
pub fn parse(xml: &str) -> CrmResult<QueryExpression> {
    let root = parse_tree(xml)?;
    if root.name != "fetch" {
        return Err(CrmError::fetch(format!(
            "expected root element 'fetch', found '{}'",
            root.name
        )));
    }
    fetch(&root)
}

// =============================================================================
// Element tree
// =============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> CrmResult<&str> {
        self.attr(name).ok_or_else(|| {
            CrmError::fetch(format!(
                "'{}' element is missing the '{}' attribute",
                self.name, name
            ))
        })
    }

    fn flag(&self, name: &str) -> CrmResult<bool> {
        match self.attr(name) {
            None => Ok(false),
            Some(v) => parse_bool(v)
                .ok_or_else(|| CrmError::fetch(format!("'{}' is not a valid value for {}", v, name))),
        }
    }

    fn number(&self, name: &str) -> CrmResult<Option<u32>> {
        self.attr(name)
            .map(|v| {
                v.trim()
                    .parse::<u32>()
                    .map_err(|_| CrmError::fetch(format!("'{}' is not a valid value for {}", v, name)))
            })
            .transpose()
    }
}

fn parse_tree(xml: &str) -> CrmResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element(&e)?),
            Ok(Event::Empty(e)) => {
                let el = element(&e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| CrmError::fetch("unbalanced end tag"))?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| CrmError::fetch(e.to_string()))?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None => return Err(CrmError::fetch("text outside the root element")),
                }
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(CrmError::fetch(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(CrmError::fetch(format!("element '{}' is not closed", open.name)));
    }
    root.ok_or_else(|| CrmError::fetch("document is empty"))
}

fn element(start: &BytesStart<'_>) -> CrmResult<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_lowercase();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CrmError::fetch(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
        let value = attr
            .unescape_value()
            .map_err(|e| CrmError::fetch(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> CrmResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
    } else if root.is_none() {
        *root = Some(el);
    } else {
        return Err(CrmError::fetch("multiple root elements"));
    }
    Ok(())
}

// =============================================================================
// Interpretation
// =============================================================================

fn fetch(root: &Element) -> CrmResult<QueryExpression> {
    let mut entities = root.children.iter().filter(|c| c.name == "entity");
    let entity = entities
        .next()
        .ok_or_else(|| CrmError::fetch("'fetch' element requires an 'entity' child"))?;
    if entities.next().is_some() {
        return Err(CrmError::fetch("'fetch' element allows a single 'entity' child"));
    }
    if let Some(other) = root.children.iter().find(|c| c.name != "entity") {
        return Err(unknown_element(other));
    }

    let entity_name = entity.required("name")?.to_lowercase();
    let mut query = QueryExpression::new(&entity_name);
    query.distinct = root.flag("distinct")?;
    query.aggregate = root.flag("aggregate")?;
    query.no_lock = root.flag("no-lock")?;
    query.top_count = root.number("top")?;

    let count = root.number("count")?;
    let page = root.number("page")?;
    let cookie = root.attr("paging-cookie").map(str::to_string);
    let total = root.flag("returntotalrecordcount")?;
    if count.is_some() || page.is_some() || cookie.is_some() || total {
        query.page_info = Some(PagingInfo {
            count: count.unwrap_or(0),
            page_number: page.unwrap_or(0),
            paging_cookie: cookie,
            return_total_record_count: total,
        });
    }

    let body = body(entity, &entity_name)?;
    query.column_set = body.columns;
    query.criteria = body.criteria;
    query.orders = body.orders;
    query.link_entities = body.links;
    Ok(query)
}

/// Contents shared by `entity` and `link-entity`.
struct Body {
    columns: ColumnSet,
    criteria: FilterNode,
    orders: Vec<OrderExpression>,
    links: Vec<LinkEntity>,
}

fn body(el: &Element, entity_name: &str) -> CrmResult<Body> {
    let mut columns = ColumnSet::none();
    let mut criteria: Option<FilterNode> = None;
    let mut orders = Vec::new();
    let mut links = Vec::new();

    for child in &el.children {
        match child.name.as_str() {
            "attribute" => column(child, &mut columns)?,
            "all-attributes" => columns.all_columns = true,
            "order" => orders.push(order(child)?),
            "filter" => {
                let node = filter(child)?;
                match criteria.as_mut() {
                    None => criteria = Some(node),
                    Some(existing) => existing.and_filter(node),
                }
            }
            "link-entity" => links.push(link(child, entity_name)?),
            _ => return Err(unknown_element(child)),
        }
    }

    Ok(Body {
        columns,
        criteria: criteria.unwrap_or_default(),
        orders,
        links,
    })
}

fn column(el: &Element, columns: &mut ColumnSet) -> CrmResult<()> {
    let name = el.required("name")?.to_lowercase();
    let alias = el.attr("alias").map(str::to_string);
    let aggregate = el
        .attr("aggregate")
        .map(|a| {
            AggregateFn::from_name(a)
                .ok_or_else(|| CrmError::fetch(format!("'{}' is not a valid aggregate", a)))
        })
        .transpose()?;
    let date_grouping = el
        .attr("dategrouping")
        .map(|g| {
            DateGrouping::from_name(g)
                .ok_or_else(|| CrmError::fetch(format!("'{}' is not a valid dategrouping", g)))
        })
        .transpose()?;
    let group_by = el.flag("groupby")?;
    let distinct = el.flag("distinct")?;

    if alias.is_none() && aggregate.is_none() && !group_by && date_grouping.is_none() {
        columns.columns.push(name);
    } else {
        columns.attribute_expressions.push(AttributeExpression {
            attribute_name: name,
            alias,
            aggregate,
            has_group_by: group_by,
            date_grouping,
            distinct,
        });
    }
    Ok(())
}

fn order(el: &Element) -> CrmResult<OrderExpression> {
    let order_type = if el.flag("descending")? {
        OrderType::Descending
    } else {
        OrderType::Ascending
    };
    let mut order = match (el.attr("attribute"), el.attr("alias")) {
        (Some(attribute), _) => OrderExpression::new(attribute.to_lowercase(), order_type),
        (None, Some(alias)) => OrderExpression::by_alias(alias, order_type),
        (None, None) => {
            return Err(CrmError::fetch(
                "'order' element requires an 'attribute' or 'alias'",
            ))
        }
    };
    if let (Some(_), Some(alias)) = (el.attr("attribute"), el.attr("alias")) {
        order.alias = Some(alias.to_string());
    }
    order.entity_name = el.attr("entityname").map(str::to_string);
    Ok(order)
}

fn filter(el: &Element) -> CrmResult<FilterNode> {
    let operator = match el.attr("type").map(str::to_ascii_lowercase).as_deref() {
        None | Some("and") => LogicalOperator::And,
        Some("or") => LogicalOperator::Or,
        Some(other) => {
            return Err(CrmError::fetch(format!("'{}' is not a valid filter type", other)))
        }
    };
    let mut node = FilterNode::new(operator);
    for child in &el.children {
        match child.name.as_str() {
            "condition" => node.add_condition(condition(child)?),
            "filter" => node.add_filter(filter(child)?),
            _ => return Err(unknown_element(child)),
        }
    }
    Ok(node)
}

fn condition(el: &Element) -> CrmResult<Condition> {
    let attribute = el.required("attribute")?.to_lowercase();
    let name = el.required("operator")?;
    let operator = ConditionOperator::from_fetch_name(name)
        .ok_or_else(|| CrmError::fetch(format!("'{}' is not a valid condition operator", name)))?;

    let mut values = Vec::new();
    if let Some(v) = el.attr("value") {
        values.push(Value::String(v.to_string()));
    }
    for child in &el.children {
        if child.name != "value" {
            return Err(unknown_element(child));
        }
        values.push(Value::String(child.text.clone()));
    }

    let mut condition = Condition::new(attribute, operator, values);
    condition.entity_name = el.attr("entityname").map(str::to_string);
    Ok(condition)
}

fn link(el: &Element, parent: &str) -> CrmResult<LinkEntity> {
    let name = el.required("name")?.to_lowercase();
    let join = match el.attr("link-type").map(str::to_ascii_lowercase).as_deref() {
        None | Some("inner") => JoinOperator::Inner,
        Some("outer") => JoinOperator::LeftOuter,
        Some(other) => {
            return Err(CrmError::fetch(format!("'{}' is not a valid link-type", other)))
        }
    };
    let target_attribute = el
        .attr("from")
        .map(str::to_lowercase)
        .unwrap_or_else(|| primary_id_for(&name));
    let parent_attribute = el
        .attr("to")
        .map(str::to_lowercase)
        .unwrap_or_else(|| primary_id_for(parent));

    let mut link = LinkEntity::new(parent, &name, &parent_attribute, &target_attribute, join);
    link.entity_alias = el.attr("alias").map(str::to_string);

    let body = body(el, &name)?;
    link.columns = body.columns;
    link.link_criteria = body.criteria;
    link.orders = body.orders;
    link.link_entities = body.links;
    Ok(link)
}

fn unknown_element(el: &Element) -> CrmError {
    CrmError::fetch(format!("'{}' is not a valid element here", el.name))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
