//! AWS 클라우드 감사/네트워크 로그

use crate::logtype::LogTypeConfig;
use crate::parser::{AdapterFactory, CsvAdapter, JsonEnvelopeAdapter};
use crate::schema::{Field, FieldKind, Schema, TimeFormat};

pub const TYPE_CLOUDTRAIL: &str = "AWS.CloudTrail";
pub const TYPE_VPC_FLOW: &str = "AWS.VPCFlow";

/// VPC 플로우 로그 기본(v2) 형식의 열 순서
const VPC_FLOW_COLUMNS: [&str; 14] = [
    "version",
    "account-id",
    "interface-id",
    "srcaddr",
    "dstaddr",
    "srcport",
    "dstport",
    "protocol",
    "packets",
    "bytes",
    "start",
    "end",
    "action",
    "log-status",
];

/// AWS 로그 타입 선언
pub fn log_types() -> Vec<LogTypeConfig> {
    vec![
        LogTypeConfig::new(
            TYPE_CLOUDTRAIL,
            "AWS CloudTrail API activity",
            "https://docs.aws.amazon.com/awscloudtrail/latest/userguide/cloudtrail-event-reference-record-contents.html",
            cloudtrail_schema(),
        )
        .with_parser(AdapterFactory::shared(
            JsonEnvelopeAdapter::new("Records").allow_bare_records(true),
        )),
        LogTypeConfig::new(
            TYPE_VPC_FLOW,
            "AWS VPC flow logs (default format)",
            "https://docs.aws.amazon.com/vpc/latest/userguide/flow-log-records.html",
            vpc_flow_schema(),
        )
        .with_parser(AdapterFactory::shared(
            CsvAdapter::new(VPC_FLOW_COLUMNS)
                .delimiter(b' ')
                .null_tokens(["-"]),
        )),
    ]
}

fn cloudtrail_schema() -> Schema {
    let user_identity = vec![
        Field::string("type", "The type of the identity"),
        Field::string("principalId", "A unique identifier for the entity that made the call"),
        Field::string("arn", "The ARN of the principal that made the call"),
        Field::string("accountId", "The account that owns the entity that granted permissions"),
        Field::string("accessKeyId", "The access key ID that was used to sign the request"),
        Field::string("userName", "The friendly name of the identity that made the call"),
        Field::string("invokedBy", "The name of the AWS service that made the request"),
    ];
    let resource = FieldKind::Object(vec![
        Field::string("arn", "Resource ARN"),
        Field::string("accountId", "Account ID of the resource owner"),
        Field::string("type", "Resource type identifier"),
    ]);

    Schema::new(vec![
        Field::string("eventVersion", "The version of the log event format").required(),
        Field::object("userIdentity", user_identity, "Information about the user that made a request"),
        Field::timestamp("eventTime", TimeFormat::Rfc3339, "The date and time the request was made, in UTC")
            .required()
            .event_time(),
        Field::string("eventSource", "The service that the request was made to").required(),
        Field::string("eventName", "The requested action").required(),
        Field::string("awsRegion", "The AWS region that the request was made to").required(),
        Field::string("sourceIPAddress", "The IP address that the request was made from"),
        Field::string("userAgent", "The agent through which the request was made"),
        Field::string("errorCode", "The AWS service error if the request returns an error"),
        Field::string("errorMessage", "The error description if the request returns an error"),
        Field::string("requestID", "The value that identifies the request"),
        Field::string("eventID", "GUID generated by CloudTrail to uniquely identify each event").required(),
        Field::string("eventType", "Identifies the type of event that generated the event record").required(),
        Field::string("apiVersion", "Identifies the API version associated with the event"),
        Field::boolean("readOnly", "Identifies whether this operation is a read-only operation"),
        Field::array("resources", resource, "A list of resources accessed in the event"),
        Field::string("recipientAccountId", "Represents the account ID that received this event"),
        Field::string("sharedEventID", "GUID generated by CloudTrail to identify events delivered to multiple accounts"),
        Field::string("vpcEndpointId", "Identifies the VPC endpoint in which requests were made"),
        Field::boolean("managementEvent", "Whether the event is a management event"),
        Field::string("eventCategory", "Shows the event category"),
    ])
}

fn vpc_flow_schema() -> Schema {
    Schema::new(vec![
        Field::integer("version", "The VPC flow logs version").required(),
        Field::string("account_id", "The AWS account ID of the owner of the source network interface")
            .source("account-id")
            .required(),
        Field::string("interface_id", "The ID of the network interface for which the traffic is recorded")
            .source("interface-id")
            .required(),
        Field::string("srcaddr", "The source address for incoming traffic"),
        Field::string("dstaddr", "The destination address for outgoing traffic"),
        Field::integer("srcport", "The source port of the traffic"),
        Field::integer("dstport", "The destination port of the traffic"),
        Field::integer("protocol", "The IANA protocol number of the traffic"),
        Field::integer("packets", "The number of packets transferred during the flow"),
        Field::integer("bytes", "The number of bytes transferred during the flow"),
        Field::timestamp("start", TimeFormat::UnixSeconds, "The time when the first packet of the flow was received")
            .required()
            .event_time(),
        Field::timestamp("end", TimeFormat::UnixSeconds, "The time when the last packet of the flow was received")
            .required(),
        Field::string("action", "The action that is associated with the traffic (ACCEPT or REJECT)"),
        Field::string("log_status", "The logging status of the flow log (OK, NODATA, SKIPDATA)")
            .source("log-status")
            .required(),
    ])
}
